//! Subscription handles.
//!
//! A [`Subscription`] is one registration of a handler against one event on
//! one emitter. It holds only a weak reference to the emitter. Its
//! `connected` flag goes from true to false exactly once and never back.

use crate::dispatcher::Handler;
use crate::emitter::{Emitter, EmitterId, NativeHandle};
use crate::error::EventError;
use signalkit_core::FailurePolicy;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

signalkit_core::define_id!(
    /// Unique identity of a subscription, allocated by the event bus
    pub SubscriptionId,
    "Sub"
);

struct SubscriptionState {
    id: SubscriptionId,
    emitter: Weak<dyn Emitter>,
    emitter_id: EmitterId,
    emitter_label: String,
    event_name: String,
    handler: Handler,
    policy: FailurePolicy,
    native: Cell<Option<NativeHandle>>,
    connected: Cell<bool>,
}

/// Handle to one registration. Clones refer to the same registration.
#[derive(Clone)]
pub struct Subscription {
    state: Rc<SubscriptionState>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        emitter: &Rc<dyn Emitter>,
        event_name: &str,
        handler: Handler,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            state: Rc::new(SubscriptionState {
                id,
                emitter: Rc::downgrade(emitter),
                emitter_id: emitter.id(),
                emitter_label: emitter.describe(),
                event_name: event_name.to_string(),
                handler,
                policy,
                native: Cell::new(None),
                connected: Cell::new(true),
            }),
        }
    }

    pub(crate) fn bind_native(&self, native: NativeHandle) {
        self.state.native.set(Some(native));
    }

    pub fn id(&self) -> SubscriptionId {
        self.state.id
    }

    pub fn event_name(&self) -> &str {
        &self.state.event_name
    }

    pub fn handler(&self) -> &Handler {
        &self.state.handler
    }

    /// Identity of the emitter this subscription was created against
    pub fn emitter_id(&self) -> EmitterId {
        self.state.emitter_id
    }

    /// Description of the emitter, captured at connect time
    pub fn emitter_label(&self) -> &str {
        &self.state.emitter_label
    }

    /// The emitter, if it is still alive
    pub fn emitter(&self) -> Option<Rc<dyn Emitter>> {
        self.state.emitter.upgrade()
    }

    /// True when `emitter` is the object this subscription was created against.
    ///
    /// Compares addresses, so emitters whose ids came from different
    /// allocators are still told apart.
    pub fn belongs_to<E>(&self, emitter: &E) -> bool
    where
        E: Emitter + ?Sized,
    {
        std::ptr::addr_eq(self.state.emitter.as_ptr(), emitter as *const E)
    }

    /// Handle assigned by the emitter at registration
    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.state.native.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.get()
    }

    /// True when both handles refer to the same registration
    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Disconnect through the emitter this subscription was created against.
    ///
    /// Fails with [`EventError::DoubleDisconnect`] if already disconnected,
    /// unless `ignore_errors` is set. If the emitter has been dropped the
    /// subscription is only marked disconnected.
    ///
    /// The handle does not know which bus created it, so this disconnect
    /// is not recorded in any bus history. Use [`crate::EventBus::disconnect`]
    /// when the history has to show it.
    pub fn disconnect(&self, ignore_errors: bool) -> Result<(), EventError> {
        if !self.is_connected() {
            if ignore_errors {
                tracing::debug!("{} already disconnected, ignoring", self.id());
                return Ok(());
            }
            return Err(self.state.policy.raise(EventError::DoubleDisconnect {
                emitter: self.state.emitter_label.clone(),
                event: self.state.event_name.clone(),
            }));
        }

        if let (Some(emitter), Some(native)) = (self.emitter(), self.native_handle()) {
            if !emitter.unregister_handler(&self.state.event_name, native) {
                tracing::warn!(
                    "{} was not registered on {} for '{}'",
                    self.id(),
                    self.state.emitter_label,
                    self.state.event_name
                );
            }
        }
        self.terminate();
        tracing::debug!("{} disconnected from '{}'", self.id(), self.event_name());
        Ok(())
    }

    /// Flip `connected` to false. Returns whether it was connected.
    pub(crate) fn terminate(&self) -> bool {
        self.state.connected.replace(false)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.state.id)
            .field("emitter", &self.state.emitter_label)
            .field("event", &self.state.event_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}::{})",
            self.state.id, self.state.emitter_label, self.state.event_name
        )
    }
}
