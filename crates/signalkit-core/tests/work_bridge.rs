use signalkit_core::{BridgeConfig, WorkBridge, WorkFault};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_units_complete() {
    let bridge = WorkBridge::current();
    let total = Arc::new(AtomicUsize::new(0));

    let mut pending = Vec::new();
    for i in 0..16usize {
        let bridge = bridge.clone();
        let total = total.clone();
        pending.push(tokio::spawn(async move {
            bridge
                .run(move || total.fetch_add(i, Ordering::SeqCst))
                .await
        }));
    }
    for task in pending {
        task.await.unwrap().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), (0..16).sum::<usize>());
    assert_eq!(bridge.submitted(), 16);
    assert_eq!(bridge.completed(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panic_is_reported_and_bridge_keeps_working() {
    let bridge = WorkBridge::current();

    let fault = bridge
        .run(|| -> u8 { panic!("sensor offline") })
        .await
        .unwrap_err();
    assert!(fault.is_panic());
    assert!(fault.to_string().contains("sensor offline"));

    assert_eq!(bridge.run(|| 7u8).await.unwrap(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_try_run_surfaces_failure() {
    let bridge = WorkBridge::current();
    let fault = bridge
        .try_run(|| -> anyhow::Result<()> { anyhow::bail!("disk full") })
        .await
        .unwrap_err();

    assert!(matches!(fault, WorkFault::Failed(_)));
    assert!(fault.to_string().contains("disk full"));
}

#[test]
fn test_blocking_caller_on_built_runtime() {
    let config = BridgeConfig {
        worker_threads: 1,
        max_blocking_threads: 2,
        thread_name: "bridge-test".to_string(),
    };
    let runtime = WorkBridge::build_runtime(&config).unwrap();
    let bridge = WorkBridge::new(runtime.handle().clone());

    let name = bridge
        .run_blocking(|| std::thread::current().name().map(str::to_string))
        .unwrap();
    assert_eq!(name.as_deref(), Some("bridge-test"));
}
