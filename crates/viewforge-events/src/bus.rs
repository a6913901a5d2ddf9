use std::collections::HashMap;
use std::sync::RwLock;

use crate::kinds::{EventKind, ViewEvent};

/// A registered listener. Stored as a boxed closure rather than the
/// teacher's Lua-registry-id indirection (`pickaxe-events::bus::
/// ListenerEntry`), since this core has no scripting layer of its own —
/// hosts register native closures directly.
type Listener = Box<dyn Fn(&mut ViewEvent) + Send + Sync>;

/// Synchronous, cancellable event multiplexer keyed by event kind.
/// Listeners run in registration order; a cancellation halts propagation
/// (spec.md §4.6).
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a listener for one event kind. Returns nothing — unlike
    /// the teacher's bus there is no unregister-by-id path, since view
    /// engine listeners are expected to live for the process lifetime
    /// (mirroring how `pickaxe-events` listeners are never individually
    /// torn down either, only replaced wholesale on mod reload).
    pub fn register<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&mut ViewEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(Box::new(listener));
    }

    /// Dispatches `event` to every listener registered for its kind, in
    /// order, stopping as soon as a listener cancels it. Mutations to the
    /// event (`output`, `stage`) are visible to subsequent listeners in the
    /// same dispatch.
    pub fn dispatch(&self, event: &mut ViewEvent) {
        let kind = event.kind();
        let listeners = self.listeners.read().unwrap();
        let Some(handlers) = listeners.get(&kind) else {
            return;
        };
        for handler in handlers {
            handler(event);
            if event.is_cancelled() {
                tracing::trace!(?kind, "event cancelled, halting listener propagation");
                break;
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
