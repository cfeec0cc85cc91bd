//! # Error Module - Custom *Picoarrow* Error Type
//!
//! Defines the unified error type for Picoarrow.
//!
//! ## Features
//! - Covers allocation exhaustion, malformed type requests, format-string and
//! metadata decoding failures, counter/offset overflow, finish-time invariant
//! violations, and decode-time layout mismatches.
//! - Implements `Display` for readable output and `Error` for integration
//! with standard Rust error handling.

use std::error::Error;
use std::fmt;

/// Catch all error type for `Picoarrow`.
///
/// The six variants are deliberately disjoint: callers respond differently to
/// an allocator that is out of memory than to input that failed validation,
/// so no operation maps one condition onto another variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PicoarrowError {
    /// Buffer growth could not obtain (or address) the requested memory.
    Allocation { message: String },
    /// Unsupported or malformed schema/type request, including operations
    /// invoked in a lifecycle state that does not permit them.
    Type { message: String },
    /// Malformed compact format string or metadata byte layout.
    Format { message: String },
    /// Counter or offset overflow, e.g. a 32-bit offsets buffer exhausted.
    Capacity { message: String },
    /// Finish-time invariant violation: buffer sizing, offset monotonicity,
    /// or child/buffer arity mismatch while building.
    Validation { message: String },
    /// Decode-time failure: a finished array judged inconsistent with the
    /// schema it is being viewed through.
    Layout { message: String },
}

impl PicoarrowError {
    #[inline]
    pub fn allocation(message: impl Into<String>) -> Self {
        PicoarrowError::Allocation {
            message: message.into(),
        }
    }

    #[inline]
    pub fn type_error(message: impl Into<String>) -> Self {
        PicoarrowError::Type {
            message: message.into(),
        }
    }

    #[inline]
    pub fn format(message: impl Into<String>) -> Self {
        PicoarrowError::Format {
            message: message.into(),
        }
    }

    #[inline]
    pub fn capacity(message: impl Into<String>) -> Self {
        PicoarrowError::Capacity {
            message: message.into(),
        }
    }

    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        PicoarrowError::Validation {
            message: message.into(),
        }
    }

    #[inline]
    pub fn layout(message: impl Into<String>) -> Self {
        PicoarrowError::Layout {
            message: message.into(),
        }
    }

    /// The carried message, without the kind prefix.
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            PicoarrowError::Allocation { message }
            | PicoarrowError::Type { message }
            | PicoarrowError::Format { message }
            | PicoarrowError::Capacity { message }
            | PicoarrowError::Validation { message }
            | PicoarrowError::Layout { message } => message,
        }
    }

    /// Short kind name, stable for matching in logs and tests.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            PicoarrowError::Allocation { .. } => "allocation",
            PicoarrowError::Type { .. } => "type",
            PicoarrowError::Format { .. } => "format",
            PicoarrowError::Capacity { .. } => "capacity",
            PicoarrowError::Validation { .. } => "validation",
            PicoarrowError::Layout { .. } => "layout",
        }
    }

    /// Nonzero status code for the streaming protocol, one per kind.
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            PicoarrowError::Allocation { .. } => 1,
            PicoarrowError::Type { .. } => 2,
            PicoarrowError::Format { .. } => 3,
            PicoarrowError::Capacity { .. } => 4,
            PicoarrowError::Validation { .. } => 5,
            PicoarrowError::Layout { .. } => 6,
        }
    }
}

impl fmt::Display for PicoarrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PicoarrowError::Allocation { message } => {
                write!(f, "Allocation error: {}", message)
            }
            PicoarrowError::Type { message } => {
                write!(f, "Type error: {}", message)
            }
            PicoarrowError::Format { message } => {
                write!(f, "Format error: {}", message)
            }
            PicoarrowError::Capacity { message } => {
                write!(f, "Capacity error: {}", message)
            }
            PicoarrowError::Validation { message } => {
                write!(f, "Validation error: {}", message)
            }
            PicoarrowError::Layout { message } => {
                write!(f, "Layout error: {}", message)
            }
        }
    }
}

impl Error for PicoarrowError {}
