//! Contract checks and failure policy
//!
//! Contract violations are surfaced where they happen. A [`FailurePolicy`]
//! decides whether a violation is returned to the caller or aborts the
//! process (the hard-abort mode used while debugging lifecycle bugs).
//!
//! Error types that can be built from a bare assertion message implement
//! [`AssertionError`], so a check can raise any of them without runtime
//! type inspection.

use crate::error::{AssertionFailure, Error};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::panic::Location;

/// How a detected contract violation is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the error to the caller
    #[default]
    Report,
    /// Log the error and panic
    Abort,
}

impl FailurePolicy {
    /// `Abort` in debug builds, `Report` in release builds
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Abort
        } else {
            Self::Report
        }
    }

    /// Surface `err` according to this policy.
    ///
    /// Returns the error unchanged under `Report`. Under `Abort` the error is
    /// logged with the caller's location and the thread panics.
    #[track_caller]
    pub fn raise<E: Display>(self, err: E) -> E {
        if self == Self::Abort {
            let location = Location::caller();
            tracing::error!(
                "ASSERTION FAILURE ({}:{}): {}",
                location.file(),
                location.line(),
                err
            );
            panic!("{}", err);
        }
        err
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// An error type that can be constructed from an assertion message.
pub trait AssertionError: Sized {
    /// Build the error for a failed check described by `message`.
    fn from_assertion(message: String) -> Self;
}

impl AssertionError for AssertionFailure {
    fn from_assertion(message: String) -> Self {
        AssertionFailure { message }
    }
}

impl AssertionError for Error {
    fn from_assertion(message: String) -> Self {
        Error::Assertion(AssertionFailure { message })
    }
}

/// Check `condition`, raising `E` built from `message` when it does not hold.
#[track_caller]
pub fn ensure<E: AssertionError>(condition: bool, message: impl Into<String>) -> Result<(), E> {
    if condition {
        return Ok(());
    }
    let message = message.into();
    let location = Location::caller();
    tracing::debug!(
        "check failed at {}:{}: {}",
        location.file(),
        location.line(),
        message
    );
    Err(E::from_assertion(message))
}

/// Check `condition` under `policy`, building the error lazily.
#[track_caller]
pub fn ensure_with<E, F>(policy: FailurePolicy, condition: bool, make_err: F) -> Result<(), E>
where
    E: Display,
    F: FnOnce() -> E,
{
    if condition {
        Ok(())
    } else {
        Err(policy.raise(make_err()))
    }
}
