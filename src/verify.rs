//! Assertion primitives and panic classification.
//!
//! Assertions signal through panics carrying a [`Failure`] payload; the
//! engine recognizes that payload to tell an assertion failure apart from
//! any other panic. Nothing else in the crate depends on the concrete
//! assertions offered here.

use std::any::{Any, TypeId};
use std::fmt;
use std::panic;

/// Distinguishes a definite failure from an inconclusive result. Both end a
/// scenario; the split is carried in the payload for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Failed,
    Inconclusive,
}

/// Panic payload raised by the assertion helpers.
#[derive(Debug, Clone)]
pub struct Failure {
    pub message: String,
    pub kind: FailureKind,
}

/// Raises an assertion failure with the given message.
pub fn fail(message: impl Into<String>) -> ! {
    panic::panic_any(Failure {
        message: message.into(),
        kind: FailureKind::Failed,
    })
}

/// Raises an inconclusive signal with the given message.
pub fn inconclusive(message: impl Into<String>) -> ! {
    panic::panic_any(Failure {
        message: message.into(),
        kind: FailureKind::Inconclusive,
    })
}

/// Asserts that `condition` holds.
pub fn that(condition: bool, message: impl Into<String>) {
    if !condition {
        fail(message);
    }
}

/// Asserts equality, reporting both sides on mismatch.
pub fn equal<T: PartialEq + fmt::Debug>(actual: T, expected: T) {
    if actual != expected {
        fail(format!("expected {:?}, got {:?}", expected, actual));
    }
}

/// Asserts inequality.
pub fn not_equal<T: PartialEq + fmt::Debug>(actual: T, unexpected: T) {
    if actual == unexpected {
        fail(format!("expected anything but {:?}", unexpected));
    }
}

/// Asserts that the option is empty.
pub fn is_none<T: fmt::Debug>(value: &Option<T>) {
    if let Some(inner) = value {
        fail(format!("expected None, got Some({:?})", inner));
    }
}

/// Asserts that the option holds a value.
pub fn is_some<T>(value: &Option<T>) {
    if value.is_none() {
        fail("expected Some, got None");
    }
}

/// A panic payload captured during execution, with helpers to classify and
/// render it.
pub struct CaughtPanic {
    payload: Box<dyn Any + Send>,
}

impl CaughtPanic {
    pub(crate) fn new(payload: Box<dyn Any + Send>) -> Self {
        Self { payload }
    }

    /// True when the payload's concrete type is `E`.
    pub fn is<E: Any>(&self) -> bool {
        self.payload.downcast_ref::<E>().is_some()
    }

    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }

    pub(crate) fn type_matches(&self, expected: TypeId) -> bool {
        self.payload.as_ref().type_id() == expected
    }

    /// The failure classification, `None` when the payload is not a
    /// [`Failure`].
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.downcast_ref::<Failure>().map(|failure| failure.kind)
    }

    /// Renders the payload as text. [`Failure`] and plain string payloads
    /// yield their message; anything else gets a placeholder.
    pub fn message(&self) -> String {
        if let Some(failure) = self.downcast_ref::<Failure>() {
            failure.message.clone()
        } else if let Some(text) = self.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = self.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else {
            "non-string panic payload".to_string()
        }
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaughtPanic")
            .field("message", &self.message())
            .finish()
    }
}
