//! # signalkit Events
//!
//! Subscription lifecycle and variadic dispatch over named events.
//!
//! An [`Emitter`] declares events and fires them with a sequence of
//! [`Variant`] arguments. The [`EventBus`] connects [`Handler`]s to those
//! events and returns a [`Subscription`] per registration, which can later be
//! disconnected exactly once.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let button = Rc::new(LocalEmitter::new(bus.ids(), "ok").with_event("toggled", Arity::Fixed(1)));
//! let sub = bus.connect_fn(&button, "toggled", |on: bool| println!("toggled: {}", on))?;
//! button.emit("toggled", &args![true])?;
//! bus.disconnect(&*button, &sub, false)?;
//! ```

pub mod bus;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod subscription;
pub mod variant;

pub use bus::{
    event_bus, init_event_bus, BusEvent, BusEventKind, ConnectOptions, EventBus, EventBusConfig,
};
pub use dispatcher::{Arity, Dispatcher, Handler, IntoHandler, MAX_ARITY};
pub use emitter::{Emitter, EmitterId, LocalEmitter, NativeHandle};
pub use error::{DispatchError, EventError, EventResult};
pub use subscription::{Subscription, SubscriptionId};
pub use variant::{FromVariant, ObjectId, Variant, Vector2, Vector3, MAX_NESTING};
