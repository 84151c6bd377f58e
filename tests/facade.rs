use signalkit::{args, Arity, Config, EventBus, Handler, LocalEmitter, WorkBridge};
use std::rc::Rc;

#[test]
fn test_version_info() {
    assert!(!signalkit::VERSION.is_empty());
    assert!(signalkit::BUILD_DATE.ends_with("UTC"));
}

#[test]
fn test_bus_built_from_default_config() {
    let config = Config::default();
    let bus = EventBus::with_config(config.event_bus.clone());
    let emitter =
        Rc::new(LocalEmitter::new(bus.ids(), "cursor").with_event("moved", Arity::Fixed(2)));

    let seen = signalkit::shared_vec();
    let sink = seen.clone();
    bus.connect(
        &emitter,
        "moved",
        Handler::new(move |x: f64, y: f64| sink.borrow_mut().push((x, y))),
    )
    .unwrap();

    emitter.emit("moved", &args![1, 2.5]).unwrap();
    assert_eq!(*seen.borrow(), vec![(1.0, 2.5)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bridge_from_facade() {
    let bridge = WorkBridge::current();
    assert_eq!(bridge.run(|| 6 * 7).await.unwrap(), 42);
}
