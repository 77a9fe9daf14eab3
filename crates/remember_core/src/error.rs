//! Caller-facing error classification shared by every core error type.

use std::fmt::{Display, Formatter};

/// Coarse error category surfaced to callers.
///
/// - `Validation`: malformed input, nothing was mutated.
/// - `NotFound`: the referenced backup does not exist.
/// - `Storage`: durable storage failed; the operation was rolled back and
///   may be retried by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Storage)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
