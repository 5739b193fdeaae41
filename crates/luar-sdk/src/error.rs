//! Error types for host-side value operations

use std::fmt;

use crate::channel::ChannelError;

/// Result type for host value operations
pub type HostResult<T> = Result<T, HostError>;

/// Host value operation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// A value is not assignable to the required type
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Required type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Map key type is not comparable
    #[error("unhashable map key of type {0}")]
    Unhashable(String),

    /// Slice index past the length
    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange {
        /// Requested zero-based index
        index: usize,
        /// Slice length
        len: usize,
    },

    /// Load or store through a nil pointer
    #[error("invalid memory address or nil pointer dereference")]
    NilPointer,

    /// Channel protocol violation
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Operation not permitted by the channel direction
    #[error("invalid operation: cannot {op} on {ty}")]
    Direction {
        /// Attempted operation ("send" or "receive")
        op: &'static str,
        /// Channel type
        ty: String,
    },

    /// Host function called with the wrong number of arguments
    #[error("wrong argument count: expected {expected}, got {got}")]
    Arity {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Host function body failed
    #[error("{0}")]
    Call(String),
}

impl HostError {
    /// Build a type mismatch from anything displayable
    pub fn mismatch(expected: impl fmt::Display, got: impl fmt::Display) -> Self {
        HostError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Call(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Call(s.to_string())
    }
}
