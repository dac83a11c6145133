//! Timestamping front end for an [`EventDispatcher`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use super::handler::{DispatchOutcome, EventDispatcher, EventHandler, SharedHandler, SubscriptionId};
use super::input::Event;

/// Stamps events with the dispatch time and hands them to its dispatcher.
pub struct EventManager {
    dispatcher: EventDispatcher,
    dispatch_count: u64,
    last_timestamp: Option<Duration>,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            dispatcher: EventDispatcher::new(),
            dispatch_count: 0,
            last_timestamp: None,
        }
    }

    pub fn subscribe<H: EventHandler + 'static>(&mut self, handler: &Rc<RefCell<H>>) -> SubscriptionId {
        self.dispatcher.subscribe(handler)
    }

    pub fn subscribe_shared(&mut self, handler: &SharedHandler) -> SubscriptionId {
        self.dispatcher.subscribe_shared(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Set `event.timestamp` to `timestamp` and dispatch it.
    pub fn dispatch_event(&mut self, mut event: Event, timestamp: Duration) -> DispatchOutcome {
        event.timestamp = timestamp;
        self.dispatch_count += 1;
        self.last_timestamp = Some(timestamp);
        let outcome = self.dispatcher.dispatch(&event);
        trace!(count = self.dispatch_count, ?timestamp, "manager dispatched");
        outcome
    }

    /// Events dispatched through this manager so far.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count
    }

    /// Timestamp of the most recent dispatch.
    pub fn last_timestamp(&self) -> Option<Duration> {
        self.last_timestamp
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
