//! Error types for event subscription and dispatch.
//!
//! Every error here is a contract violation between a caller, an emitter and
//! a handler. None of them are retried.

use thiserror::Error;

/// Errors raised while delivering one firing to one handler.
///
/// Fatal to that delivery: the handler is not invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The firing carried a different number of arguments than the handler takes
    #[error("Expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Parameter count declared by the handler.
        expected: usize,
        /// Argument count carried by the firing.
        actual: usize,
    },

    /// An argument could not be converted to the handler's parameter type
    #[error("Argument {position} has type {actual}, expected {expected}")]
    ArgumentType {
        /// Zero-based argument position.
        position: usize,
        /// Parameter type declared by the handler.
        expected: &'static str,
        /// Type of the value actually passed.
        actual: &'static str,
    },
}

/// Errors raised by the connect/disconnect protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The emitter does not declare the event
    #[error("{emitter} does not declare an event named '{event}'")]
    UnknownEvent {
        /// Description of the emitter.
        emitter: String,
        /// The requested event name.
        event: String,
    },

    /// The subscription was already disconnected
    #[error("Attempted to disconnect event '{event}' of {emitter} more than once")]
    DoubleDisconnect {
        /// Description of the emitter the subscription was made against.
        emitter: String,
        /// The subscribed event name.
        event: String,
    },

    /// The subscription belongs to a different emitter
    #[error("The subscription's emitter ({expected}) does not match {actual}")]
    EmitterMismatch {
        /// Emitter the subscription was created against.
        expected: String,
        /// Emitter the disconnect was invoked through.
        actual: String,
    },

    /// No registration matched a handler-based disconnect
    #[error("No connection of event '{event}' on {emitter} matches the handler")]
    NotConnected {
        /// Description of the emitter.
        emitter: String,
        /// The event name searched.
        event: String,
    },

    /// A handler rejected a firing
    #[error("Dispatch of '{event}' failed: {source}")]
    Dispatch {
        /// The event being fired.
        event: String,
        /// The rejection.
        #[source]
        source: DispatchError,
    },
}

impl EventError {
    /// Check if this error comes from a handler rejecting a firing
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, EventError::Dispatch { .. })
    }

    /// The dispatch rejection, if this is one
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            EventError::Dispatch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for event operations
pub type EventResult<T> = Result<T, EventError>;
