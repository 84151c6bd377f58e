//! Error handling for signalkit
//!
//! Provides the error types shared by every layer of the workspace:
//! - Queue errors (bounded queue misuse)
//! - Work faults (units of work run through the worker-pool bridge)
//! - Assertion failures (contract checks raised through [`crate::assert`])
//! - Codec errors (versioned binary encoding)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Bounded queue error type
///
/// Raised immediately at the point of misuse; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Dequeue or peek on an empty queue
    #[error("Queue is empty")]
    EmptyQueue,

    /// Indexed read past the end of the queue
    #[error("Index {index} out of range for queue of length {len}")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// The queue length at the time of the read.
        len: usize,
    },

    /// A queue was constructed with a capacity of zero
    #[error("Queue capacity must be greater than zero")]
    ZeroCapacity,
}

/// Fault raised by a unit of work submitted to the worker pool.
#[derive(Error, Debug)]
pub enum WorkFault {
    /// The work panicked on the pool thread
    #[error("Work panicked: {message}")]
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The work ran to completion and reported an error
    #[error("Work failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    /// The pool dropped the work without running it (runtime shut down)
    #[error("Work was dropped before it completed")]
    Canceled,
}

impl WorkFault {
    /// Check if the work panicked
    pub fn is_panic(&self) -> bool {
        matches!(self, WorkFault::Panicked { .. })
    }
}

/// Generic assertion failure
///
/// The default error raised by [`crate::assert::ensure`] when the caller
/// does not ask for a more specific type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Assertion failed: {message}")]
pub struct AssertionFailure {
    /// Description of the violated condition.
    pub message: String,
}

/// Binary codec error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input was written by a different format version
    #[error("Unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version this decoder understands.
        expected: u8,
        /// The version found in the header.
        found: u8,
    },

    /// The input ended in the middle of a field
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the field being decoded.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A string field did not contain valid UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// An enum discriminant was not recognised
    #[error("Invalid tag {tag} for {type_name}")]
    InvalidTag {
        /// The tag byte read from the input.
        tag: u8,
        /// The type being decoded.
        type_name: &'static str,
    },

    /// Bytes were left over after the value was decoded
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    /// Nested values went deeper than the decoder allows
    #[error("Nesting deeper than {limit} levels")]
    NestingTooDeep {
        /// Deepest nesting accepted.
        limit: usize,
    },

    /// A sequence was too long for its `u32` length prefix
    #[error("Sequence of {len} elements does not fit a u32 length prefix")]
    LengthOverflow {
        /// Length of the rejected sequence.
        len: usize,
    },
}

/// Main error type for signalkit-core
///
/// A unified error type that can represent any error raised by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Work fault
    #[error(transparent)]
    Work(#[from] WorkFault),

    /// Assertion failure
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    /// Codec error
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a queue error
    pub fn is_queue_error(&self) -> bool {
        matches!(self, Error::Queue(_))
    }

    /// Check if this is a work fault
    pub fn is_work_fault(&self) -> bool {
        matches!(self, Error::Work(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_display() {
        assert_eq!(QueueError::EmptyQueue.to_string(), "Queue is empty");
        assert_eq!(
            QueueError::IndexOutOfRange { index: 4, len: 2 }.to_string(),
            "Index 4 out of range for queue of length 2"
        );
    }

    #[test]
    fn test_work_fault_display() {
        let fault = WorkFault::Panicked {
            message: "boom".to_string(),
        };
        assert_eq!(fault.to_string(), "Work panicked: boom");
        assert!(fault.is_panic());

        let fault = WorkFault::Failed(anyhow::anyhow!("disk full"));
        assert_eq!(fault.to_string(), "Work failed: disk full");
        assert!(!fault.is_panic());
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = QueueError::EmptyQueue.into();
        assert!(err.is_queue_error());

        let err: Error = WorkFault::Canceled.into();
        assert!(err.is_work_fault());

        let err: Error = CodecError::InvalidUtf8.into();
        assert_eq!(err.to_string(), "Invalid UTF-8 in string field");
    }

    #[test]
    fn test_codec_limit_display() {
        assert_eq!(
            CodecError::NestingTooDeep { limit: 64 }.to_string(),
            "Nesting deeper than 64 levels"
        );
        assert_eq!(
            CodecError::LengthOverflow { len: 5_000_000_000 }.to_string(),
            "Sequence of 5000000000 elements does not fit a u32 length prefix"
        );
    }
}
