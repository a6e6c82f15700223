//! Event fan-out to subscribers.
//!
//! Subscribers register closures under a normalized event name.
//! Dispatch is synchronous on the read-loop task: handlers must be
//! quick and must not block on replies from this same connection.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use super::event::ServerEvent;

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Name-keyed subscriber registry with synchronous fan-out.
pub struct EventDispatcher {
    subscribers: Mutex<HashMap<String, Vec<EventHandler>>>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a handler to the given normalized event name.
    pub fn subscribe<F>(&self, event_name: &str, handler: F)
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock().expect("dispatcher lock");
        subscribers
            .entry(event_name.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Fan an event out to every subscriber of its name.
    ///
    /// A panicking subscriber is isolated and logged; the remaining
    /// subscribers still run and dispatcher state stays intact.
    pub fn dispatch(&self, event: &ServerEvent) {
        let handlers: Vec<EventHandler> = {
            let subscribers = self.subscribers.lock().expect("dispatcher lock");
            match subscribers.get(event.name()) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(event = event.name(), "event subscriber panicked");
            }
        }
    }

    /// Number of subscribers currently registered for a name.
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscribers
            .lock()
            .expect("dispatcher lock")
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
