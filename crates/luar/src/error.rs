//! Bridge errors
//!
//! Every error aborts the script call chain it occurs in. Nothing here is
//! retried; absent map keys and receives on closed channels are not errors.

use luar_sdk::{ChannelError, HostError};
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Host value with no script representation
    Unsupported,
    /// Script value cannot be coerced to the required host type
    TypeMismatch,
    /// Write to a non-addressable struct copy
    Addressability,
    /// Operation through a nil pointer
    NilDereference,
    /// Too few arguments for a host function
    Arity,
    /// Misuse of a proxied value's protocol
    Protocol,
    /// Host function failure
    Runtime,
}

/// Errors raised by conversions and proxy operators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Host kind with no defined conversion
    #[error("luar: unsupported host type {type_name}")]
    Unsupported {
        /// Host type name
        type_name: String,
    },

    /// Script value not coercible to the hint
    #[error("luar: cannot use {got} as {expected}")]
    TypeMismatch {
        /// Required type
        expected: String,
        /// Offending value's type
        got: String,
    },

    /// Field write on a struct handle obtained by value
    #[error("luar: cannot assign to field {field} of non-addressable {type_name}")]
    NotAddressable {
        /// Struct type name
        type_name: String,
        /// Field name
        field: String,
    },

    /// Operation through a nil pointer
    #[error("luar: invalid memory address or nil pointer dereference")]
    NilDereference,

    /// Host function called with too few arguments
    #[error("luar: {function} expects {expected} argument(s), got {got}")]
    Arity {
        /// Function signature
        function: String,
        /// Required argument count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Slice index outside `1..=len`
    #[error("luar: index out of range [{index}] with length {len}")]
    IndexOutOfRange {
        /// Script-side index
        index: i64,
        /// Slice length
        len: usize,
    },

    /// Send on a closed channel
    #[error("luar: send on closed channel")]
    SendOnClosedChannel,

    /// Second close of a channel
    #[error("luar: close of closed channel")]
    CloseOfClosedChannel,

    /// Operation the channel's direction does not permit
    #[error("luar: cannot {op} on {type_name}")]
    ChannelDirection {
        /// Attempted operation
        op: &'static str,
        /// Channel type
        type_name: String,
    },

    /// Write to a field that does not exist or is not exported
    #[error("luar: {type_name} has no field {field}")]
    UnknownField {
        /// Struct type name
        type_name: String,
        /// Field name
        field: String,
    },

    /// Operator not supported by the handle or pointee
    #[error("luar: cannot {op} a value of type {type_name}")]
    BadOperand {
        /// Operator name
        op: &'static str,
        /// Operand type
        type_name: String,
    },

    /// Registry slot taken by a value of another type
    #[error("luar: registry key {key} holds a foreign value")]
    RegistryCollision {
        /// Registry key
        key: String,
    },

    /// Host function failed
    #[error("luar: {0}")]
    Runtime(String),
}

impl BridgeError {
    /// Type mismatch from anything displayable
    pub fn mismatch(expected: impl std::fmt::Display, got: impl std::fmt::Display) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Unsupported { .. } => ErrorCategory::Unsupported,
            BridgeError::TypeMismatch { .. } => ErrorCategory::TypeMismatch,
            BridgeError::NotAddressable { .. } => ErrorCategory::Addressability,
            BridgeError::NilDereference => ErrorCategory::NilDereference,
            BridgeError::Arity { .. } => ErrorCategory::Arity,
            BridgeError::IndexOutOfRange { .. }
            | BridgeError::SendOnClosedChannel
            | BridgeError::CloseOfClosedChannel
            | BridgeError::ChannelDirection { .. }
            | BridgeError::UnknownField { .. }
            | BridgeError::BadOperand { .. }
            | BridgeError::RegistryCollision { .. } => ErrorCategory::Protocol,
            BridgeError::Runtime(_) => ErrorCategory::Runtime,
        }
    }
}

impl From<HostError> for BridgeError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::TypeMismatch { expected, got } => BridgeError::TypeMismatch { expected, got },
            HostError::Unhashable(type_name) => BridgeError::TypeMismatch {
                expected: "comparable map key".to_string(),
                got: type_name,
            },
            HostError::IndexOutOfRange { index, len } => BridgeError::IndexOutOfRange {
                index: index as i64 + 1,
                len,
            },
            HostError::NilPointer => BridgeError::NilDereference,
            HostError::Channel(ChannelError::SendOnClosed) => BridgeError::SendOnClosedChannel,
            HostError::Channel(ChannelError::CloseOfClosed) => BridgeError::CloseOfClosedChannel,
            HostError::Direction { op, ty } => BridgeError::ChannelDirection { op, type_name: ty },
            HostError::Arity { expected, got } => BridgeError::Arity {
                function: "host function".to_string(),
                expected,
                got,
            },
            HostError::Call(message) => BridgeError::Runtime(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_categories() {
        let cases = [
            (HostError::mismatch("int", "string"), ErrorCategory::TypeMismatch),
            (HostError::Unhashable("[]int".into()), ErrorCategory::TypeMismatch),
            (HostError::NilPointer, ErrorCategory::NilDereference),
            (HostError::Channel(ChannelError::CloseOfClosed), ErrorCategory::Protocol),
            (HostError::Call("boom".into()), ErrorCategory::Runtime),
        ];
        for (host, category) in cases {
            assert_eq!(BridgeError::from(host).category(), category);
        }
    }

    #[test]
    fn test_index_reported_one_based() {
        let err = BridgeError::from(HostError::IndexOutOfRange { index: 3, len: 3 });
        assert_eq!(err, BridgeError::IndexOutOfRange { index: 4, len: 3 });
    }
}
