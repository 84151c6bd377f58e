//! Type aliases for commonly used shared-state types.
//!
//! Event dispatch is single-threaded and uses the `Rc<RefCell<T>>` family;
//! state touched by pool threads uses the `Arc<Mutex<T>>` family.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signalkit_core::types::*;
//!
//! // Instead of: Rc<RefCell<Vec<String>>>
//! let seen: SharedVec<String> = shared_vec();
//!
//! // Instead of: Arc<Mutex<u64>>
//! let total: ThreadSafe<u64> = thread_safe(0);
//! ```

use parking_lot::Mutex;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

// =============================================================================
// SINGLE-THREADED SHARED TYPES (Rc<RefCell<T>>)
// =============================================================================

/// A reference-counted, interior-mutable wrapper for single-threaded sharing.
///
/// Handlers connected to an emitter capture state this way; they always run
/// on the emitter's owner thread.
pub type Shared<T> = Rc<RefCell<T>>;

/// A shared vector for single-threaded collection management.
pub type SharedVec<T> = Rc<RefCell<Vec<T>>>;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<T>>)
// =============================================================================

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe vector for cross-thread collection management.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new `Shared<T>` from a value.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Create a new empty `SharedVec<T>`.
#[inline]
pub fn shared_vec<T>() -> SharedVec<T> {
    Rc::new(RefCell::new(Vec::new()))
}

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}
