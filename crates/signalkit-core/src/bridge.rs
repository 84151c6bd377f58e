//! Worker-pool bridge.
//!
//! Runs a unit of work on the tokio blocking pool and hands its outcome back
//! to the submitting caller through a single-use completion channel. The
//! pool thread consumes the sender exactly once, after the work has finished
//! and its value (or fault) has been captured, so the caller never resumes
//! early and never resumes twice.
//!
//! Submitted work cannot be cancelled and there is no built-in timeout. A
//! caller that needs a bounded wait wraps the future in
//! `tokio::time::timeout`; the work keeps running regardless.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let bridge = WorkBridge::current();
//! let checksum = bridge.run(move || crc32(&payload)).await?;
//! ```

use crate::error::WorkFault;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;

/// Configuration for a dedicated bridge runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Number of async worker threads.
    pub worker_threads: usize,
    /// Upper bound on blocking-pool threads running submitted work.
    pub max_blocking_threads: usize,
    /// Name given to pool threads.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_blocking_threads: 64,
            thread_name: "signalkit-pool".to_string(),
        }
    }
}

/// Submission counters
#[derive(Debug, Default)]
struct BridgeStats {
    submitted: AtomicU64,
    completed: AtomicU64,
}

/// Bridge from callers to the blocking pool of a tokio runtime
#[derive(Debug, Clone)]
pub struct WorkBridge {
    handle: Handle,
    stats: Arc<BridgeStats>,
}

impl WorkBridge {
    /// Create a bridge submitting to the runtime behind `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            stats: Arc::new(BridgeStats::default()),
        }
    }

    /// Create a bridge for the runtime the caller is running on
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Build a runtime sized by `config`, for hosts that do not own one
    pub fn build_runtime(config: &BridgeConfig) -> std::io::Result<Runtime> {
        Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .max_blocking_threads(config.max_blocking_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
    }

    /// Run `work` on the pool and wait for its value
    pub async fn run<T, F>(&self, work: F) -> Result<T, WorkFault>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let completion = self.submit(work);
        completion.await.map_err(|_| WorkFault::Canceled)?
    }

    /// Run `work`, which produces no value, and wait for it to finish
    pub async fn run_unit<F>(&self, work: F) -> Result<(), WorkFault>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(work).await
    }

    /// Run fallible `work`, surfacing its error as [`WorkFault::Failed`]
    pub async fn try_run<T, F>(&self, work: F) -> Result<T, WorkFault>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run(work).await?.map_err(WorkFault::Failed)
    }

    /// Run `work` on the pool and block the calling thread until it finishes.
    ///
    /// For synchronous callers only.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context.
    pub fn run_blocking<T, F>(&self, work: F) -> Result<T, WorkFault>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let completion = self.submit(work);
        completion.blocking_recv().map_err(|_| WorkFault::Canceled)?
    }

    /// Units submitted so far
    pub fn submitted(&self) -> u64 {
        self.stats.submitted.load(Ordering::Acquire)
    }

    /// Units that have finished, successfully or not
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Acquire)
    }

    fn submit<T, F>(&self, work: F) -> oneshot::Receiver<Result<T, WorkFault>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (completion, receiver) = oneshot::channel();
        let stats = self.stats.clone();
        stats.submitted.fetch_add(1, Ordering::AcqRel);

        self.handle.spawn_blocking(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!("Pool work panicked: {}", message);
                WorkFault::Panicked { message }
            });
            stats.completed.fetch_add(1, Ordering::AcqRel);
            // The caller may have stopped waiting; the outcome is then dropped.
            let _ = completion.send(outcome);
        });

        receiver
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_returns_value() {
        let bridge = WorkBridge::current();
        let value = bridge.run(|| 42).await.expect("work should succeed");
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resumes_after_work_side_effects() {
        let bridge = WorkBridge::current();
        let log = Arc::new(Mutex::new(Vec::new()));

        let work_log = log.clone();
        bridge
            .run_unit(move || {
                std::thread::sleep(Duration::from_millis(20));
                work_log.lock().push("work");
            })
            .await
            .expect("work should succeed");
        log.lock().push("caller");

        assert_eq!(*log.lock(), vec!["work", "caller"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panic_propagates() {
        let bridge = WorkBridge::current();
        let fault = bridge
            .run(|| -> u32 { panic!("pool exploded") })
            .await
            .unwrap_err();

        match fault {
            WorkFault::Panicked { message } => assert_eq!(message, "pool exploded"),
            other => panic!("unexpected fault: {:?}", other),
        }
        assert_eq!(bridge.completed(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_try_run_surfaces_error() {
        let bridge = WorkBridge::current();
        let fault = bridge
            .try_run(|| -> anyhow::Result<()> { anyhow::bail!("bad input") })
            .await
            .unwrap_err();
        assert!(matches!(fault, WorkFault::Failed(_)));
        assert_eq!(fault.to_string(), "Work failed: bad input");
    }

    #[test]
    fn test_run_blocking_on_dedicated_runtime() {
        let runtime = WorkBridge::build_runtime(&BridgeConfig::default()).unwrap();
        let bridge = WorkBridge::new(runtime.handle().clone());

        let value = bridge.run_blocking(|| "done".to_string()).unwrap();
        assert_eq!(value, "done");
        assert_eq!(bridge.submitted(), 1);
        assert_eq!(bridge.completed(), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
