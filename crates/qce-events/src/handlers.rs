//! Ordered handler registry keyed by event type.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::event::Event;

/// Callback invoked for each matching event.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identifies one registration, for [`HandlerRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(HandlerId, Handler)>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` for `event_type`; handlers run in registration order.
    pub fn add(&self, event_type: &str, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one handler, or every handler for the type when `id` is `None`.
    pub fn remove(&self, event_type: &str, id: Option<HandlerId>) {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        match id {
            None => {
                handlers.remove(event_type);
            }
            Some(id) => {
                if let Some(list) = handlers.get_mut(event_type) {
                    list.retain(|(existing, _)| *existing != id);
                }
            }
        }
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Run every handler for the event's type.
    ///
    /// Handlers are called outside the lock so they may register or remove
    /// handlers themselves. A panicking handler is logged and skipped.
    pub fn dispatch(&self, event: &Event) {
        let targets: Vec<Handler> = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(&event.event_type) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };

        for handler in targets {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(event_type = %event.event_type, "event handler panicked");
            }
        }
    }
}
