//! Event Bus implementation.
//!
//! Provides the connect/disconnect protocol over any [`Emitter`] and the
//! global bus instance.
//!
//! The bus itself is `Sync`; it keeps no emitter state. Connection lists live
//! in each emitter, which must only be touched from its owner thread.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use signalkit_core::{BoundedQueue, FailurePolicy, IdAllocator};
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use crate::dispatcher::{Dispatcher, Handler, IntoHandler};
use crate::emitter::{Emitter, EmitterId};
use crate::error::{EventError, EventResult};
use crate::subscription::{Subscription, SubscriptionId};

/// Configuration for the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// How contract violations are surfaced.
    pub failure_policy: FailurePolicy,
    /// Whether to keep a lifecycle history.
    pub enable_history: bool,
    /// Maximum number of lifecycle events to retain.
    pub max_history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Report,
            enable_history: false,
            max_history_size: 256,
        }
    }
}

/// Options for [`EventBus::connect_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Disconnect existing registrations of the same handler first.
    pub auto_disconnect: bool,
    /// Skip the declared-event check.
    pub ignore_errors: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_disconnect: true,
            ignore_errors: false,
        }
    }
}

/// Kind of lifecycle change recorded in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEventKind {
    Connected(SubscriptionId),
    Disconnected(SubscriptionId),
    /// Every registration of the event was removed at once
    DisconnectedAll { count: usize },
}

/// One recorded lifecycle change
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub kind: BusEventKind,
    pub emitter: EmitterId,
    pub event_name: String,
    pub timestamp: Instant,
}

/// Connect/disconnect API over emitters
pub struct EventBus {
    /// Source of subscription ids
    ids: IdAllocator,
    /// Lifecycle history (optional)
    history: RwLock<BoundedQueue<BusEvent>>,
    /// Configuration
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        // Capacity is never zero, so construction cannot fail.
        let history = BoundedQueue::new(config.max_history_size.max(1))
            .unwrap_or_else(|_| unreachable!("history capacity is at least one"));
        Self {
            ids: IdAllocator::new(),
            history: RwLock::new(history),
            config,
        }
    }

    /// The bus's identifier allocator, shared with emitters it creates ids for
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Connect `handler` to `event_name` with default options
    pub fn connect<E>(
        &self,
        emitter: &Rc<E>,
        event_name: &str,
        handler: Handler,
    ) -> EventResult<Subscription>
    where
        E: Emitter + 'static,
    {
        self.connect_with(emitter, event_name, handler, ConnectOptions::default())
    }

    /// Connect a typed closure to `event_name` with default options
    pub fn connect_fn<E, Args, F>(
        &self,
        emitter: &Rc<E>,
        event_name: &str,
        callable: F,
    ) -> EventResult<Subscription>
    where
        E: Emitter + 'static,
        F: IntoHandler<Args>,
    {
        self.connect(emitter, event_name, Handler::new(callable))
    }

    /// Connect `handler` to `event_name`.
    ///
    /// Unless `ignore_errors` is set, the emitter must declare the event.
    /// With `auto_disconnect`, every existing registration of a matching
    /// handler on the same event is removed first, so reconnecting never
    /// leaves duplicates behind.
    pub fn connect_with<E>(
        &self,
        emitter: &Rc<E>,
        event_name: &str,
        handler: Handler,
        options: ConnectOptions,
    ) -> EventResult<Subscription>
    where
        E: Emitter + 'static,
    {
        let emitter: Rc<dyn Emitter> = emitter.clone();

        match emitter.declared_arity(event_name) {
            None if !options.ignore_errors => {
                return Err(self.fail(EventError::UnknownEvent {
                    emitter: emitter.describe(),
                    event: event_name.to_string(),
                }));
            }
            Some(declared) if !declared.is_compatible(handler.arity()) => {
                tracing::warn!(
                    "{} fires '{}' with {} arguments but {} takes {}",
                    emitter.describe(),
                    event_name,
                    declared,
                    handler.callable_name(),
                    handler.arity()
                );
            }
            _ => {}
        }

        if options.auto_disconnect {
            self.disconnect_matching(&*emitter, event_name, &handler);
        }

        let subscription = Subscription::new(
            self.ids.next(),
            &emitter,
            event_name,
            handler,
            self.config.failure_policy,
        );
        let dispatcher = Rc::new(Dispatcher::new(subscription.clone()));
        let native = emitter.register_handler(event_name, dispatcher);
        subscription.bind_native(native);

        tracing::debug!("{} connected ({})", subscription, native);
        self.record(
            BusEventKind::Connected(subscription.id()),
            emitter.id(),
            event_name,
        );
        Ok(subscription)
    }

    /// Disconnect `subscription` through `emitter`.
    ///
    /// Fails with [`EventError::EmitterMismatch`] when `emitter` is not the
    /// one the subscription was created against, even with `ignore_errors`.
    /// Fails with [`EventError::DoubleDisconnect`] when the subscription was
    /// already disconnected, unless `ignore_errors` is set.
    pub fn disconnect<E>(
        &self,
        emitter: &E,
        subscription: &Subscription,
        ignore_errors: bool,
    ) -> EventResult<()>
    where
        E: Emitter + ?Sized,
    {
        if !subscription.belongs_to(emitter) {
            return Err(self.fail(EventError::EmitterMismatch {
                expected: subscription.emitter_label().to_string(),
                actual: emitter.describe(),
            }));
        }

        let was_connected = subscription.is_connected();
        subscription.disconnect(ignore_errors)?;
        if was_connected {
            self.record(
                BusEventKind::Disconnected(subscription.id()),
                emitter.id(),
                subscription.event_name(),
            );
        }
        Ok(())
    }

    /// Disconnect every registration of `handler` on `event_name`.
    ///
    /// Matches by reference, then by underlying callable. Returns how many
    /// registrations were removed; fails with [`EventError::NotConnected`]
    /// when none matched, unless `ignore_not_connected` is set.
    pub fn disconnect_handler<E>(
        &self,
        emitter: &E,
        event_name: &str,
        handler: &Handler,
        ignore_not_connected: bool,
    ) -> EventResult<usize>
    where
        E: Emitter + ?Sized,
    {
        let removed = self.disconnect_matching(emitter, event_name, handler);
        if removed == 0 && !ignore_not_connected {
            return Err(self.fail(EventError::NotConnected {
                emitter: emitter.describe(),
                event: event_name.to_string(),
            }));
        }
        Ok(removed)
    }

    /// Disconnect every registration of `event_name`. Returns how many were removed.
    pub fn disconnect_all<E>(&self, emitter: &E, event_name: &str) -> usize
    where
        E: Emitter + ?Sized,
    {
        let connections = emitter.list_active_connections(event_name);
        let count = connections.len();
        for (native, dispatcher) in connections {
            emitter.unregister_handler(event_name, native);
            dispatcher.subscription().terminate();
        }

        if count > 0 {
            tracing::debug!(
                "Disconnected all {} connections of '{}' on {}",
                count,
                event_name,
                emitter.describe()
            );
            self.record(
                BusEventKind::DisconnectedAll { count },
                emitter.id(),
                event_name,
            );
        }
        count
    }

    /// Find the registration of `handler` on `event_name`.
    ///
    /// A registration of the same handler instance is preferred; otherwise
    /// the first registration wrapping the same callable is returned.
    pub fn find_subscription<E>(
        &self,
        emitter: &E,
        event_name: &str,
        handler: &Handler,
    ) -> Option<Subscription>
    where
        E: Emitter + ?Sized,
    {
        let connections = emitter.list_active_connections(event_name);
        connections
            .iter()
            .find(|(_, dispatcher)| dispatcher.handler().same_instance(handler))
            .or_else(|| {
                connections
                    .iter()
                    .find(|(_, dispatcher)| dispatcher.handler().same_callable(handler))
            })
            .map(|(_, dispatcher)| dispatcher.subscription().clone())
    }

    /// Number of registrations of `event_name`
    pub fn connection_count<E>(&self, emitter: &E, event_name: &str) -> usize
    where
        E: Emitter + ?Sized,
    {
        emitter.list_active_connections(event_name).len()
    }

    /// Get recent lifecycle history (if enabled)
    ///
    /// Returns events since the given instant, or all history if None.
    /// Only operations that go through this bus are recorded, so a
    /// [`Subscription::disconnect`] call made on the handle itself leaves
    /// no [`BusEventKind::Disconnected`] entry.
    pub fn history(&self, since: Option<Instant>) -> Vec<BusEvent> {
        if !self.config.enable_history {
            return Vec::new();
        }

        let history = self.history.read();
        match since {
            Some(since) => history
                .iter()
                .filter(|e| e.timestamp >= since)
                .cloned()
                .collect(),
            None => history.to_vec(),
        }
    }

    /// Clear lifecycle history
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    fn disconnect_matching<E>(&self, emitter: &E, event_name: &str, handler: &Handler) -> usize
    where
        E: Emitter + ?Sized,
    {
        let mut removed = 0;
        for (native, dispatcher) in emitter.list_active_connections(event_name) {
            if !dispatcher.handler().matches(handler) {
                continue;
            }
            emitter.unregister_handler(event_name, native);
            let subscription = dispatcher.subscription();
            if subscription.terminate() {
                self.record(
                    BusEventKind::Disconnected(subscription.id()),
                    emitter.id(),
                    event_name,
                );
            }
            tracing::debug!("{} replaced or removed by handler match", subscription);
            removed += 1;
        }
        removed
    }

    #[track_caller]
    fn fail(&self, err: EventError) -> EventError {
        self.config.failure_policy.raise(err)
    }

    fn record(&self, kind: BusEventKind, emitter: EmitterId, event_name: &str) {
        if !self.config.enable_history {
            return;
        }
        self.history.write().enqueue(BusEvent {
            kind,
            emitter,
            event_name: event_name.to_string(),
            timestamp: Instant::now(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("last_subscription", &self.ids.last())
            .field("config", &self.config)
            .finish()
    }
}

/// Global event bus instance
static EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Get or initialize the global event bus
pub fn event_bus() -> &'static EventBus {
    EVENT_BUS.get_or_init(EventBus::new)
}

/// Initialize the global event bus with custom configuration
///
/// Must be called before any calls to `event_bus()`. Returns the rejected
/// configuration if the event bus has already been initialized.
pub fn init_event_bus(config: EventBusConfig) -> Result<(), EventBusConfig> {
    EVENT_BUS
        .set(EventBus::with_config(config))
        .map_err(|bus| bus.config)
}

/// Connect a typed closure through the global event bus
#[macro_export]
macro_rules! on_event {
    ($emitter:expr, $event:expr, $handler:expr) => {
        $crate::bus::event_bus().connect_fn($emitter, $event, $handler)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Arity;
    use crate::emitter::LocalEmitter;
    use signalkit_core::shared;

    fn button(bus: &EventBus) -> Rc<LocalEmitter> {
        Rc::new(
            LocalEmitter::new(bus.ids(), "ok_button")
                .with_event("pressed", Arity::Fixed(0))
                .with_event("toggled", Arity::Fixed(1)),
        )
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.config().failure_policy, FailurePolicy::Report);
        assert!(bus.history(None).is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config: EventBusConfig =
            serde_json::from_str(r#"{"failure_policy": "abort", "enable_history": true}"#)
                .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.enable_history);
        assert_eq!(config.max_history_size, 256);
    }

    #[test]
    fn test_connect_and_fire() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let presses = shared(0);

        let counter = presses.clone();
        let sub = bus
            .connect_fn(&emitter, "pressed", move || *counter.borrow_mut() += 1)
            .expect("connect should succeed");

        assert!(sub.is_connected());
        assert_eq!(sub.emitter_id(), emitter.id());
        assert_eq!(emitter.emit("pressed", &[]).unwrap(), 1);
        assert_eq!(*presses.borrow(), 1);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let err = bus
            .connect(&emitter, "pressd", Handler::new(|| {}))
            .unwrap_err();
        assert!(matches!(err, EventError::UnknownEvent { .. }));
        assert_eq!(bus.connection_count(&*emitter, "pressd"), 0);
    }

    #[test]
    fn test_unknown_event_ignored_on_request() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let options = ConnectOptions {
            ignore_errors: true,
            ..Default::default()
        };
        let sub = bus
            .connect_with(&emitter, "custom", Handler::new(|| {}), options)
            .unwrap();
        assert!(sub.is_connected());
        assert_eq!(bus.connection_count(&*emitter, "custom"), 1);
    }

    #[test]
    fn test_auto_disconnect_replaces_same_handler() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let handler = Handler::new(|_on: bool| {});

        let first = bus.connect(&emitter, "toggled", handler.clone()).unwrap();
        let second = bus.connect(&emitter, "toggled", handler).unwrap();

        assert!(!first.is_connected());
        assert!(second.is_connected());
        assert_eq!(bus.connection_count(&*emitter, "toggled"), 1);
    }

    #[test]
    fn test_without_auto_disconnect_duplicates_remain() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let handler = Handler::new(|| {});
        let options = ConnectOptions {
            auto_disconnect: false,
            ..Default::default()
        };

        bus.connect_with(&emitter, "pressed", handler.clone(), options)
            .unwrap();
        bus.connect_with(&emitter, "pressed", handler, options)
            .unwrap();
        assert_eq!(bus.connection_count(&*emitter, "pressed"), 2);
    }

    #[test]
    fn test_disconnect_handler_not_connected() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let handler = Handler::new(|| {});

        let err = bus
            .disconnect_handler(&*emitter, "pressed", &handler, false)
            .unwrap_err();
        assert!(matches!(err, EventError::NotConnected { .. }));
        assert_eq!(
            bus.disconnect_handler(&*emitter, "pressed", &handler, true)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_find_prefers_same_instance() {
        let bus = EventBus::new();
        let emitter = button(&bus);
        let options = ConnectOptions {
            auto_disconnect: false,
            ..Default::default()
        };

        let make = || Handler::new(|_on: bool| {});
        let first_handler = make();
        let second_handler = make();
        let first = bus
            .connect_with(&emitter, "toggled", first_handler, options)
            .unwrap();
        let second = bus
            .connect_with(&emitter, "toggled", second_handler.clone(), options)
            .unwrap();

        let found = bus
            .find_subscription(&*emitter, "toggled", &second_handler)
            .unwrap();
        assert_eq!(found, second);

        let structural = bus
            .find_subscription(&*emitter, "toggled", &make())
            .unwrap();
        assert_eq!(structural, first);

        assert!(bus
            .find_subscription(&*emitter, "toggled", &Handler::new(|_on: bool| {}))
            .is_none());
    }

    #[test]
    fn test_history_records_lifecycle() {
        let bus = EventBus::with_config(EventBusConfig {
            enable_history: true,
            max_history_size: 3,
            ..Default::default()
        });
        let emitter = button(&bus);

        let sub = bus
            .connect(&emitter, "pressed", Handler::new(|| {}))
            .unwrap();
        bus.disconnect(&*emitter, &sub, false).unwrap();
        bus.connect(&emitter, "toggled", Handler::new(|_on: bool| {}))
            .unwrap();
        bus.connect(&emitter, "toggled", Handler::new(|_pressed: bool| {}))
            .unwrap();
        bus.disconnect_all(&*emitter, "toggled");

        let history = bus.history(None);
        assert_eq!(history.len(), 3);
        assert!(matches!(
            history.last().map(|e| e.kind),
            Some(BusEventKind::DisconnectedAll { count: 2 })
        ));

        bus.clear_history();
        assert!(bus.history(None).is_empty());
    }

    #[test]
    fn test_history_skips_disconnect_through_handle() {
        let bus = EventBus::with_config(EventBusConfig {
            enable_history: true,
            ..Default::default()
        });
        let emitter = button(&bus);

        let sub = bus
            .connect(&emitter, "pressed", Handler::new(|| {}))
            .unwrap();
        sub.disconnect(false).unwrap();
        assert!(!sub.is_connected());

        let kinds: Vec<_> = bus.history(None).iter().map(|e| e.kind).collect();
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], BusEventKind::Connected(id) if id == sub.id()));
    }

    #[test]
    fn test_handler_can_disconnect_itself_while_firing() {
        let bus = Rc::new(EventBus::new());
        let emitter = button(&bus);
        let slot = shared(None::<Subscription>);
        let fired = shared(0);

        let (bus_ref, emitter_ref, slot_ref, fired_ref) =
            (bus.clone(), emitter.clone(), slot.clone(), fired.clone());
        let sub = bus
            .connect_fn(&emitter, "pressed", move || {
                *fired_ref.borrow_mut() += 1;
                if let Some(sub) = slot_ref.borrow().as_ref() {
                    bus_ref.disconnect(&*emitter_ref, sub, false).unwrap();
                }
            })
            .unwrap();
        *slot.borrow_mut() = Some(sub.clone());

        emitter.emit("pressed", &[]).unwrap();
        emitter.emit("pressed", &[]).unwrap();

        assert_eq!(*fired.borrow(), 1);
        assert!(!sub.is_connected());
    }

    #[test]
    #[should_panic(expected = "does not declare")]
    fn test_abort_policy_panics() {
        let bus = EventBus::with_config(EventBusConfig {
            failure_policy: FailurePolicy::Abort,
            ..Default::default()
        });
        let emitter = button(&bus);
        let _ = bus.connect(&emitter, "missing", Handler::new(|| {}));
    }
}
