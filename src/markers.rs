use std::sync::atomic::{AtomicBool, Ordering};

use crate::descriptor::{self, FrameDescriptor};
use crate::frame::FrameInspect;

/// Marker fired when the host begins executing an interpreted function.
pub static FUNCTION_ENTRY: MarkerPoint = MarkerPoint::new("function__entry");

/// Marker fired when an interpreted function returns, normally or while an
/// exception is unwinding through it.
pub static FUNCTION_RETURN: MarkerPoint = MarkerPoint::new("function__return");

/// One externally patchable trace point.
///
/// The activity flag is toggled by whatever attaches the observer and is
/// only ever read here, with relaxed ordering: a stale read around the
/// moment of attach/detach costs at most one extra or missing descriptor,
/// never correctness. Flags start inactive until an observer attaches.
#[derive(Debug)]
pub struct MarkerPoint {
  active: AtomicBool,
  name: &'static str,
}

impl MarkerPoint {
  pub fn activate(&self) {
    self.active.store(true, Ordering::Relaxed);
    log::trace!("marker {} activated", self.name);
  }

  pub fn deactivate(&self) {
    self.active.store(false, Ordering::Relaxed);
    log::trace!("marker {} deactivated", self.name);
  }

  /// Whether anyone is observing this marker. One relaxed load; constant
  /// false when the emission layer is compiled out.
  #[must_use]
  pub fn is_active(&self) -> bool {
    cfg!(feature = "sdt") && self.active.load(Ordering::Relaxed)
  }

  #[must_use]
  pub fn name(&self) -> &'static str {
    self.name
  }

  const fn new(name: &'static str) -> Self {
    Self {
      active: AtomicBool::new(false),
      name,
    }
  }
}

/// Host hook for the start of an interpreted-function invocation.
///
/// Inactive marker: returns immediately, no descriptor is built. Active:
/// extracts a [`FrameDescriptor`], fires the probe with
/// `(filename, funcname, lineno, token)`, and releases the descriptor's
/// buffers before handing control back to the interpreter.
pub fn on_function_entry<F: FrameInspect>(frame: &F) {
  if !FUNCTION_ENTRY.is_active() {
    return;
  }

  let fmi = descriptor::extract(frame);
  emit::function_entry(&fmi, frame.token());
}

/// Host hook for every return path out of an interpreted function.
///
/// The host must call this on normal returns and on exceptional unwinds
/// alike, so that every entry has exactly one matching return; pairing is
/// the host's contract, not verified here.
pub fn on_function_return<F: FrameInspect>(frame: &F) {
  if !FUNCTION_RETURN.is_active() {
    return;
  }

  let fmi = descriptor::extract(frame);
  emit::function_return(&fmi, frame.token());
}

#[cfg(feature = "sdt")]
mod emit {
  use probe::probe;

  use super::FrameDescriptor;

  // Out-of-line so each marker stays a single patchable address under
  // `perf probe`.
  #[inline(never)]
  pub(super) fn function_entry(fmi: &FrameDescriptor, token: usize) {
    probe!(
      functrace,
      function__entry,
      fmi.filename_ptr(),
      fmi.funcname_ptr(),
      fmi.lineno(),
      token
    );
  }

  #[inline(never)]
  pub(super) fn function_return(fmi: &FrameDescriptor, token: usize) {
    probe!(
      functrace,
      function__return,
      fmi.filename_ptr(),
      fmi.funcname_ptr(),
      fmi.lineno(),
      token
    );
  }
}

#[cfg(not(feature = "sdt"))]
mod emit {
  use super::FrameDescriptor;

  pub(super) fn function_entry(_fmi: &FrameDescriptor, _token: usize) {}

  pub(super) fn function_return(_fmi: &FrameDescriptor, _token: usize) {}
}
