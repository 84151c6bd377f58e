//! # signalkit
//!
//! Safe, introspectable event subscriptions for single-threaded object
//! systems, with an async bridge to a background worker pool.
//!
//! ## Architecture
//!
//! signalkit is organized as a workspace with multiple crates:
//!
//! 1. **signalkit-core** - Errors, contract checks, ids, bounded queue, work bridge, codec
//! 2. **signalkit-events** - Variants, handlers, emitters, subscriptions, event bus
//! 3. **signalkit-settings** - Configuration loading, saving and validation
//! 4. **signalkit** - This facade, re-exporting the above plus logging setup
//!
//! ## Features
//!
//! - **Subscription lifecycle**: connect returns a handle that disconnects exactly once
//! - **Variadic dispatch**: typed handlers of 0 to 6 parameters, checked at each firing
//! - **Handler identity**: disconnect or replace by handler, by reference or by callable
//! - **Work bridge**: run blocking work on a pool and await its result
//! - **Bounded queue**: fixed capacity, overwriting the oldest item when full

pub use signalkit_core::{
    ensure, ensure_with, AssertionError, AssertionFailure, BinaryCodec, BoundedQueue,
    BridgeConfig, CodecError, Decoder, Encoder, Error, FailurePolicy, IdAllocator, QueueError,
    Result, WorkBridge, WorkFault,
};

// Re-export type aliases for convenience
pub use signalkit_core::{
    shared, shared_vec, thread_safe, thread_safe_vec, Shared, SharedVec, ThreadSafe,
    ThreadSafeVec,
};

pub use signalkit_events::{
    args, event_bus, init_event_bus, on_event, Arity, BusEvent, BusEventKind, ConnectOptions,
    DispatchError, Emitter, EmitterId, EventBus, EventBusConfig, EventError, EventResult,
    FromVariant, Handler, IntoHandler, LocalEmitter, NativeHandle, ObjectId, Subscription,
    SubscriptionId, Variant, Vector2, Vector3, MAX_ARITY, MAX_NESTING,
};

pub use signalkit_settings::{Config, LoggingSettings, SettingsError, SettingsResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
/// - Thread ids and line numbers on every record
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging from configured [`LoggingSettings`]
///
/// `RUST_LOG` still wins over the configured level when it is set.
pub fn init_logging_with(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", settings.level, e))?;

    if settings.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(settings.with_thread_ids)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(settings.with_thread_ids)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    tracing::debug!("Logging initialized at level {}", settings.level);
    Ok(())
}
