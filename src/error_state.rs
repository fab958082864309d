use std::{
  cell::Cell,
  fmt::{self, Display, Formatter},
  sync::Arc,
};

#[derive(Debug)]
struct ErrorInner {
  kind: String,
  message: String,
  trace: Vec<String>,
}

/// An in-flight host error: the kind/value/traceback triple the interpreter
/// keeps in its pending-error slot while unwinding.
///
/// Clones share one allocation, so a restored error is observably the same
/// error, not an equal-looking copy. [`PendingError::ptr_eq`] exposes that
/// identity.
#[derive(Debug, Clone)]
pub struct PendingError {
  inner: Arc<ErrorInner>,
}

impl PendingError {
  #[must_use]
  pub fn kind(&self) -> &str {
    &self.inner.kind
  }

  #[must_use]
  pub fn message(&self) -> &str {
    &self.inner.message
  }

  #[must_use]
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      inner: Arc::new(ErrorInner {
        kind: kind.into(),
        message: message.into(),
        trace: Vec::new(),
      }),
    }
  }

  /// Whether two handles refer to the same underlying error.
  #[must_use]
  pub fn ptr_eq(&self, other: &PendingError) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  #[must_use]
  pub fn trace(&self) -> &[String] {
    &self.inner.trace
  }

  #[must_use]
  pub fn with_trace<I, S>(
    kind: impl Into<String>,
    message: impl Into<String>,
    trace: I,
  ) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: Arc::new(ErrorInner {
        kind: kind.into(),
        message: message.into(),
        trace: trace.into_iter().map(Into::into).collect(),
      }),
    }
  }
}

impl Display for PendingError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.inner.kind, self.inner.message)
  }
}

/// The host thread's pending-error slot.
///
/// Single-threaded by construction: each interpreter thread owns one slot
/// and only code running on that thread touches it.
#[derive(Default)]
pub struct ErrorSlot {
  current: Cell<Option<PendingError>>,
}

impl fmt::Debug for ErrorSlot {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErrorSlot")
      .field("current", &self.pending())
      .finish()
  }
}

impl ErrorSlot {
  #[must_use]
  pub fn is_pending(&self) -> bool {
    let current = self.current.take();
    let pending = current.is_some();
    self.current.set(current);
    pending
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// A cloned view of the pending error, if any, leaving the slot as-is.
  #[must_use]
  pub fn pending(&self) -> Option<PendingError> {
    let current = self.current.take();
    let cloned = current.clone();
    self.current.set(current);
    cloned
  }

  /// Put a saved error (or emptiness) back, replacing whatever is there.
  pub fn restore(&self, saved: Option<PendingError>) {
    self.current.set(saved);
  }

  /// Raise an error into the slot, replacing any previous one.
  pub fn set(&self, error: PendingError) {
    self.current.set(Some(error));
  }

  /// Move the pending error out, leaving the slot empty.
  #[must_use]
  pub fn take(&self) -> Option<PendingError> {
    self.current.take()
  }
}

/// Scoped snapshot of an [`ErrorSlot`].
///
/// Takes the pending error on construction and puts it back on `Drop`, on
/// every exit path including unwinds. Anything raised into the slot while
/// the guard is held is discarded by the restore.
pub struct ErrorStateGuard<'a> {
  saved: Option<PendingError>,
  slot: &'a ErrorSlot,
}

impl fmt::Debug for ErrorStateGuard<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErrorStateGuard")
      .field("saved", &self.saved)
      .field("slot", self.slot)
      .finish()
  }
}

impl<'a> ErrorStateGuard<'a> {
  #[must_use]
  pub fn preserve(slot: &'a ErrorSlot) -> Self {
    Self {
      saved: slot.take(),
      slot,
    }
  }
}

impl Drop for ErrorStateGuard<'_> {
  fn drop(&mut self) {
    self.slot.restore(self.saved.take());
  }
}
