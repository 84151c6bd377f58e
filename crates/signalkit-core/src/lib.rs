//! # signalkit Core
//!
//! Core types and utilities shared by the signalkit crates.
//! Provides the error taxonomy, contract checks, identifier allocation,
//! the bounded overwrite queue, the worker-pool bridge and the versioned
//! binary codec.

pub mod assert;
pub mod bridge;
pub mod codec;
pub mod error;
pub mod ids;
pub mod queue;
pub mod types;

pub use assert::{ensure, ensure_with, AssertionError, FailurePolicy};
pub use bridge::{BridgeConfig, WorkBridge};
pub use codec::{BinaryCodec, Decoder, Encoder};
pub use error::{AssertionFailure, CodecError, Error, QueueError, Result, WorkFault};
pub use ids::IdAllocator;
pub use queue::BoundedQueue;

// Re-export type aliases for convenience
pub use types::{
    shared, shared_vec, thread_safe, thread_safe_vec, Shared, SharedVec, ThreadSafe,
    ThreadSafeVec,
};
