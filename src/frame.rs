use std::ffi::OsStr;

use crate::error_state::ErrorSlot;

/// Read-only view of one live invocation of an interpreted function.
///
/// The host interpreter implements this for whatever it uses as a frame and
/// lends a reference to the marker hooks for the duration of one call. The
/// markers only read through it: they never store the frame, never mutate
/// it, and forward its identity to the probe only as the opaque
/// address-sized [`token`](FrameInspect::token).
///
/// Both identifier accessors return raw host text. The host may hold names
/// that have no UTF-8 or filesystem-safe rendering; deciding that is the
/// extractor's job, so the boundary stays `&OsStr` rather than `&str`.
pub trait FrameInspect {
  /// The pending-error slot of the thread executing this frame.
  fn error_slot(&self) -> &ErrorSlot;

  /// Raw function identifier, e.g. `main` or `<module>`.
  fn function_name(&self) -> &OsStr;

  /// Current instruction offset within the function's code.
  fn last_instruction(&self) -> i32;

  /// Map an instruction offset back to a source line, if the frame's line
  /// table covers it.
  fn line_for_instruction(&self, instruction: i32) -> Option<i32>;

  /// Raw source-file identifier the function was compiled from.
  fn source_file(&self) -> &OsStr;

  /// Stable address-sized identity for this invocation, handed to the
  /// probe as its fourth argument. Never dereferenced by this crate.
  fn token(&self) -> usize;
}
