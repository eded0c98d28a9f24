//! Publish/subscribe delivery of authenticated messages.
//!
//! Subscribers register per sender origin. A dispatch takes a copy of the
//! origin's subscriber list before invoking anything, so a callback that
//! subscribes during delivery is not called for the in-flight event, and
//! the registry is never borrowed while application code runs.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde_json::Value;

use crate::{host::FrameId, origin::Origin};

/// Inbound message handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Application payload
    pub data: Value,
    /// Frame the message came from, when the host can name it
    pub source: Option<FrameId>,
    /// Verified origin of the sender
    pub origin: Origin,
}

/// Subscriber callback. Return values are not observed.
pub type Subscriber = Rc<dyn Fn(&MessageEvent)>;

/// Origin → ordered subscriber list. Append-only.
#[derive(Default)]
pub struct DispatchRegistry {
    subscribers: HashMap<Origin, Vec<Subscriber>>,
}

impl DispatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the subscribers of `origin`.
    pub fn subscribe(&mut self, origin: Origin, callback: Subscriber) {
        self.subscribers.entry(origin).or_default().push(callback);
    }

    /// Copy of the subscriber list for `origin`, in registration order.
    pub fn snapshot(&self, origin: &Origin) -> Vec<Subscriber> {
        self.subscribers.get(origin).cloned().unwrap_or_default()
    }

    /// Number of subscribers registered for `origin`.
    pub fn subscriber_count(&self, origin: &Origin) -> usize {
        self.subscribers.get(origin).map_or(0, Vec::len)
    }
}

impl fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&Origin, usize> =
            self.subscribers.iter().map(|(origin, subs)| (origin, subs.len())).collect();
        f.debug_struct("DispatchRegistry").field("subscribers", &counts).finish()
    }
}

/// Shared handle to one context's [`DispatchRegistry`].
///
/// Cloning shares the registry, which lets callbacks hold a handle and
/// subscribe from inside a delivery.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher(Rc<RefCell<DispatchRegistry>>);

impl Dispatcher {
    /// Create a dispatcher over an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for messages whose verified origin is `origin`.
    pub fn subscribe<F>(&self, origin: Origin, callback: F)
    where
        F: Fn(&MessageEvent) + 'static,
    {
        self.0.borrow_mut().subscribe(origin, Rc::new(callback));
    }

    /// Deliver `event` to a snapshot of its origin's subscribers.
    ///
    /// Returns how many callbacks were invoked; zero when nobody subscribed
    /// to the event's origin.
    pub fn dispatch(&self, event: &MessageEvent) -> usize {
        let snapshot = self.0.borrow().snapshot(&event.origin);

        for callback in &snapshot {
            callback(event);
        }

        snapshot.len()
    }

    /// Number of subscribers registered for `origin`.
    pub fn subscriber_count(&self, origin: &Origin) -> usize {
        self.0.borrow().subscriber_count(origin)
    }
}
