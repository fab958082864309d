use std::{
  ffi::{CStr, CString, OsStr},
  os::raw::c_char,
  ptr,
};

use crate::error_state::{ErrorSlot, ErrorStateGuard, PendingError};
use crate::frame::FrameInspect;

/// Sentinel line number when the frame's line table cannot resolve the
/// current instruction offset.
pub const LINE_UNAVAILABLE: i32 = -1;

/// Everything a marker hands to its probe, gathered from one frame.
///
/// Descriptors live for a single probe firing. The text fields own freshly
/// allocated NUL-terminated buffers; dropping the descriptor frees them,
/// exactly once, on every control-flow path. A field is `None` when the
/// corresponding identifier had no representation in the target encoding.
#[derive(Debug)]
pub struct FrameDescriptor {
  filename: Option<CString>,
  funcname: Option<CString>,
  lineno: i32,
}

impl FrameDescriptor {
  /// Source filename in the platform filesystem encoding, if it encoded.
  #[must_use]
  pub fn filename(&self) -> Option<&CStr> {
    self.filename.as_deref()
  }

  pub(crate) fn filename_ptr(&self) -> *const c_char {
    self.filename.as_deref().map_or(ptr::null(), CStr::as_ptr)
  }

  /// Function name as UTF-8, if it encoded.
  #[must_use]
  pub fn funcname(&self) -> Option<&CStr> {
    self.funcname.as_deref()
  }

  pub(crate) fn funcname_ptr(&self) -> *const c_char {
    self.funcname.as_deref().map_or(ptr::null(), CStr::as_ptr)
  }

  /// Source line for the frame's current instruction, or
  /// [`LINE_UNAVAILABLE`].
  #[must_use]
  pub fn lineno(&self) -> i32 {
    self.lineno
  }
}

/// Gather a descriptor from a live frame.
///
/// Infallible by contract: encoding failures degrade the affected field to
/// `None` and line-table misses degrade to [`LINE_UNAVAILABLE`], so the
/// result is always fully formed. The host's pending-error slot is
/// snapshotted first and restored verbatim before returning, so an error
/// already in flight (common on the return path during unwinding) survives
/// with its identity intact and any error the encoders raise is discarded.
pub fn extract<F: FrameInspect>(frame: &F) -> FrameDescriptor {
  let _held = ErrorStateGuard::preserve(frame.error_slot());

  let filename = encode_fs(frame.source_file(), frame.error_slot());
  let funcname = encode_utf8(frame.function_name(), frame.error_slot());
  let lineno = frame
    .line_for_instruction(frame.last_instruction())
    .unwrap_or(LINE_UNAVAILABLE);

  FrameDescriptor {
    filename,
    funcname,
    lineno,
  }
}

#[cfg(unix)]
fn encode_fs(text: &OsStr, errors: &ErrorSlot) -> Option<CString> {
  use std::os::unix::ffi::OsStrExt;

  match CString::new(text.as_bytes()) {
    Ok(encoded) => Some(encoded),
    Err(_) => {
      errors.set(unrepresentable("filesystem encoding"));
      None
    }
  }
}

#[cfg(not(unix))]
fn encode_fs(text: &OsStr, errors: &ErrorSlot) -> Option<CString> {
  match text.to_str().map(CString::new) {
    Some(Ok(encoded)) => Some(encoded),
    _ => {
      errors.set(unrepresentable("filesystem encoding"));
      None
    }
  }
}

fn encode_utf8(text: &OsStr, errors: &ErrorSlot) -> Option<CString> {
  match text.to_str().map(CString::new) {
    Some(Ok(encoded)) => Some(encoded),
    _ => {
      errors.set(unrepresentable("utf-8"));
      None
    }
  }
}

fn unrepresentable(encoding: &str) -> PendingError {
  PendingError::new(
    "UnicodeEncodeError",
    format!("identifier has no {encoding} representation"),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::ffi::OsString;

  struct TestFrame {
    errors: ErrorSlot,
    filename: OsString,
    funcname: OsString,
    lasti: i32,
    line_base: Option<i32>,
  }

  impl TestFrame {
    fn new(filename: impl Into<OsString>, funcname: impl Into<OsString>) -> Self {
      Self {
        errors: ErrorSlot::new(),
        filename: filename.into(),
        funcname: funcname.into(),
        lasti: 0,
        line_base: Some(1),
      }
    }
  }

  impl FrameInspect for TestFrame {
    fn error_slot(&self) -> &ErrorSlot {
      &self.errors
    }

    fn function_name(&self) -> &OsStr {
      &self.funcname
    }

    fn last_instruction(&self) -> i32 {
      self.lasti
    }

    fn line_for_instruction(&self, instruction: i32) -> Option<i32> {
      // One line per two instruction units, as a stand-in line table.
      self.line_base.map(|base| base + instruction / 2)
    }

    fn source_file(&self) -> &OsStr {
      &self.filename
    }

    fn token(&self) -> usize {
      self as *const Self as usize
    }
  }

  #[test]
  fn extracts_all_fields_from_a_plain_frame() {
    let mut frame = TestFrame::new("script.py", "main");
    frame.lasti = 82;

    let fmi = extract(&frame);
    assert_eq!(fmi.filename().unwrap().to_str().unwrap(), "script.py");
    assert_eq!(fmi.funcname().unwrap().to_str().unwrap(), "main");
    assert_eq!(fmi.lineno(), 42);
  }

  #[test]
  fn non_ascii_utf8_funcname_is_never_degraded() {
    let frame = TestFrame::new("モジュール.py", "文字化け");

    let fmi = extract(&frame);
    assert_eq!(fmi.funcname().unwrap().to_str().unwrap(), "文字化け");
    assert_eq!(
      fmi.filename().unwrap().to_str().unwrap(),
      "モジュール.py"
    );
  }

  #[test]
  fn unresolvable_line_degrades_to_sentinel() {
    let mut frame = TestFrame::new("script.py", "main");
    frame.line_base = None;

    let fmi = extract(&frame);
    assert_eq!(fmi.lineno(), LINE_UNAVAILABLE);
    assert!(fmi.filename().is_some());
  }

  #[cfg(unix)]
  #[test]
  fn filename_with_no_filesystem_rendering_degrades_alone() {
    use std::os::unix::ffi::OsStringExt;

    let mut frame = TestFrame::new("", "main");
    frame.filename = OsString::from_vec(b"bad\0name.py".to_vec());

    let fmi = extract(&frame);
    assert!(fmi.filename().is_none());
    assert_eq!(fmi.funcname().unwrap().to_str().unwrap(), "main");
    assert_eq!(fmi.lineno(), 1);
    assert!(!frame.errors.is_pending(), "encode error must be discarded");
  }

  #[cfg(unix)]
  #[test]
  fn non_utf8_funcname_degrades_while_filename_survives() {
    use std::os::unix::ffi::OsStringExt;

    let mut frame = TestFrame::new("script.py", "");
    frame.funcname = OsString::from_vec(vec![0x66, 0xff, 0xfe, 0x6f]);

    let fmi = extract(&frame);
    assert!(fmi.funcname().is_none());
    assert_eq!(fmi.filename().unwrap().to_str().unwrap(), "script.py");
  }

  #[cfg(unix)]
  #[test]
  fn pending_error_identity_survives_encode_failures() {
    use std::os::unix::ffi::OsStringExt;

    let mut frame = TestFrame::new("", "");
    frame.filename = OsString::from_vec(b"bad\0name.py".to_vec());
    frame.funcname = OsString::from_vec(vec![0xff]);

    let in_flight = PendingError::with_trace(
      "RuntimeError",
      "already unwinding",
      ["caller.py:7"],
    );
    frame.errors.set(in_flight.clone());

    let fmi = extract(&frame);
    assert!(fmi.filename().is_none());
    assert!(fmi.funcname().is_none());

    let after = frame.errors.pending().expect("pending error was lost");
    assert!(after.ptr_eq(&in_flight));
  }

  #[test]
  fn empty_slot_stays_empty_after_extraction() {
    let frame = TestFrame::new("script.py", "main");
    let _ = extract(&frame);
    assert!(!frame.errors.is_pending());
  }

  #[test]
  fn repeated_extraction_releases_buffers_each_round() {
    let mut frame = TestFrame::new("script.py", "main");

    for round in 0..10_000 {
      frame.lasti = round % 200;
      let fmi = extract(&frame);
      assert!(fmi.lineno() >= 1);
      assert!(!fmi.filename_ptr().is_null());
      assert!(!fmi.funcname_ptr().is_null());
    }
  }
}
