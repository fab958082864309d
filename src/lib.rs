//! Static tracing markers for interpreted-function entry and return.
//!
//! The host interpreter calls [`on_function_entry`] and [`on_function_return`]
//! around every interpreted call, handing over a borrowed view of the frame.
//! When an external tracer has patched a marker active, a transient
//! [`FrameDescriptor`] (filename, function name, line number) is extracted
//! from the frame and fired through a SystemTap SDT probe point together with
//! the frame's opaque token; when nothing is attached the whole hook is one
//! relaxed boolean load. Extraction leaves the host's pending-error slot
//! observably untouched, so the markers stay invisible to program semantics
//! even while an exception unwinds.

mod descriptor;
mod error_state;
mod frame;
mod markers;

pub use {
  descriptor::{extract, FrameDescriptor, LINE_UNAVAILABLE},
  error_state::{ErrorSlot, ErrorStateGuard, PendingError},
  frame::FrameInspect,
  markers::{
    on_function_entry, on_function_return, MarkerPoint, FUNCTION_ENTRY,
    FUNCTION_RETURN,
  },
};
