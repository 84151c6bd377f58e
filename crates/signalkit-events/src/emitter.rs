//! Emitter capability.
//!
//! Any object that declares named events and calls registered dispatchers
//! when they fire can implement [`Emitter`]: a GUI widget wrapper, an engine
//! node, or the in-process [`LocalEmitter`] used for simulation and tests.
//!
//! Emitters are single-threaded. Connection lists are mutated through
//! shared references, so implementations use interior mutability and must
//! tolerate handlers that connect or disconnect while the emitter fires.

use crate::dispatcher::{Arity, Dispatcher};
use crate::error::{EventError, EventResult};
use crate::variant::Variant;
use signalkit_core::IdAllocator;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

signalkit_core::define_id!(
    /// Identity of an emitter, used to reject disconnects through the wrong emitter
    pub EmitterId,
    "Emitter"
);

signalkit_core::define_id!(
    /// Emitter-assigned handle for one registration
    pub NativeHandle,
    "Native"
);

/// The capability the event bus consumes from an event source
pub trait Emitter {
    fn id(&self) -> EmitterId;

    /// Human-readable type and name, used in error messages
    fn describe(&self) -> String;

    fn has_event(&self, name: &str) -> bool;

    /// Arity the emitter fires `name` with, or `None` when undeclared
    fn declared_arity(&self, name: &str) -> Option<Arity>;

    /// Add `dispatcher` to the connection list of `name`
    fn register_handler(&self, name: &str, dispatcher: Rc<Dispatcher>) -> NativeHandle;

    /// Remove a registration. Returns false if `handle` was not registered.
    fn unregister_handler(&self, name: &str, handle: NativeHandle) -> bool;

    /// Snapshot of the current connection list of `name`, in registration order
    fn list_active_connections(&self, name: &str) -> Vec<(NativeHandle, Rc<Dispatcher>)>;
}

type ConnectionList = Vec<(NativeHandle, Rc<Dispatcher>)>;

/// In-process emitter with a declared event table
pub struct LocalEmitter {
    id: EmitterId,
    name: String,
    events: RefCell<HashMap<String, Arity>>,
    connections: RefCell<HashMap<String, ConnectionList>>,
    handles: IdAllocator,
}

impl LocalEmitter {
    /// Create an emitter with no declared events
    pub fn new(ids: &IdAllocator, name: impl Into<String>) -> Self {
        Self {
            id: ids.next(),
            name: name.into(),
            events: RefCell::new(HashMap::new()),
            connections: RefCell::new(HashMap::new()),
            handles: IdAllocator::new(),
        }
    }

    /// Builder form of [`LocalEmitter::declare`]
    pub fn with_event(self, name: &str, arity: Arity) -> Self {
        self.declare(name, arity);
        self
    }

    /// Declare (or redeclare) an event and the arity it fires with
    pub fn declare(&self, name: &str, arity: Arity) {
        self.events.borrow_mut().insert(name.to_string(), arity);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registrations for `name`
    pub fn connection_count(&self, name: &str) -> usize {
        self.connections.borrow().get(name).map_or(0, Vec::len)
    }

    /// Fire `name` with `args`.
    ///
    /// Every dispatcher registered when the firing starts is called in
    /// registration order, except those disconnected earlier in the same
    /// firing. Returns the number of handlers invoked. If any handler rejects
    /// the arguments, the remaining handlers still run and the first
    /// rejection is returned.
    pub fn emit(&self, name: &str, args: &[Variant]) -> EventResult<usize> {
        let declared = self
            .declared_arity(name)
            .ok_or_else(|| EventError::UnknownEvent {
                emitter: self.describe(),
                event: name.to_string(),
            })?;
        if !declared.accepts(args.len()) {
            if let Arity::Fixed(expected) = declared {
                tracing::warn!(
                    "{} fired '{}' with {} arguments, declared {}",
                    self.describe(),
                    name,
                    args.len(),
                    expected
                );
            }
        }

        let snapshot: Vec<Rc<Dispatcher>> = self
            .list_active_connections(name)
            .into_iter()
            .map(|(_, dispatcher)| dispatcher)
            .collect();

        let mut invoked = 0;
        let mut first_error = None;
        for dispatcher in snapshot {
            if !dispatcher.is_live() {
                continue;
            }
            match dispatcher.dispatch(args) {
                Ok(()) => invoked += 1,
                Err(source) => {
                    tracing::error!(
                        "{} rejected '{}' on {}: {}",
                        dispatcher.subscription().id(),
                        name,
                        self.describe(),
                        source
                    );
                    first_error.get_or_insert(EventError::Dispatch {
                        event: name.to_string(),
                        source,
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(invoked),
        }
    }
}

impl Emitter for LocalEmitter {
    fn id(&self) -> EmitterId {
        self.id
    }

    fn describe(&self) -> String {
        format!("LocalEmitter '{}' ({})", self.name, self.id)
    }

    fn has_event(&self, name: &str) -> bool {
        self.events.borrow().contains_key(name)
    }

    fn declared_arity(&self, name: &str) -> Option<Arity> {
        self.events.borrow().get(name).copied()
    }

    fn register_handler(&self, name: &str, dispatcher: Rc<Dispatcher>) -> NativeHandle {
        let handle: NativeHandle = self.handles.next();
        self.connections
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push((handle, dispatcher));
        handle
    }

    fn unregister_handler(&self, name: &str, handle: NativeHandle) -> bool {
        let mut connections = self.connections.borrow_mut();
        let Some(list) = connections.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(registered, _)| *registered != handle);
        let removed = list.len() != before;
        if list.is_empty() {
            connections.remove(name);
        }
        removed
    }

    fn list_active_connections(&self, name: &str) -> Vec<(NativeHandle, Rc<Dispatcher>)> {
        self.connections
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for LocalEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmitter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("events", &self.events.borrow().len())
            .finish()
    }
}
