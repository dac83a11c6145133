//! Chain-of-responsibility dispatch over weakly held handlers.
//!
//! [`EventDispatcher`] keeps subscribers in subscription order and offers each
//! event to them one at a time until one consumes it. Subscribers are held as
//! [`Weak`] references: the dispatcher never keeps a handler alive, and a
//! dropped handler is pruned instead of invoked.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::input::Event;

// ---------------------------------------------------------------------------
// EventHandler
// ---------------------------------------------------------------------------

/// Something that reacts to input.
pub trait EventHandler {
    /// Handle `event`. Return `true` to consume it and stop propagation.
    fn handle_event(&mut self, event: &Event) -> bool;
}

/// A handler shared between its owner and one or more dispatchers.
pub type SharedHandler = Rc<RefCell<dyn EventHandler>>;

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// Identifies one subscription within a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What a dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// The subscriber that consumed the event, if any.
    pub consumed_by: Option<SubscriptionId>,
    /// How many handlers were invoked.
    pub invoked: usize,
}

impl DispatchOutcome {
    pub fn consumed(&self) -> bool {
        self.consumed_by.is_some()
    }
}

struct Subscription {
    id: SubscriptionId,
    handler: Weak<RefCell<dyn EventHandler>>,
}

/// Ordered, non-owning subscriber list.
pub struct EventDispatcher {
    subscribers: Vec<Subscription>,
    next_id: u64,
}

impl EventDispatcher {
    /// Create a new, empty dispatcher.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe a handler at the end of the chain.
    pub fn subscribe<H: EventHandler + 'static>(&mut self, handler: &Rc<RefCell<H>>) -> SubscriptionId {
        let weak: Weak<RefCell<H>> = Rc::downgrade(handler);
        self.push(weak)
    }

    /// Subscribe an already type-erased handler.
    pub fn subscribe_shared(&mut self, handler: &SharedHandler) -> SubscriptionId {
        self.push(Rc::downgrade(handler))
    }

    fn push(&mut self, handler: Weak<RefCell<dyn EventHandler>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscription { id, handler });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drop subscriptions whose handler no longer exists.
    pub fn prune(&mut self) {
        self.subscribers.retain(|s| s.handler.strong_count() > 0);
    }

    /// Number of subscriptions whose handler is still alive.
    pub fn len(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.handler.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer `event` to each live subscriber in order until one consumes it.
    ///
    /// A handler that is already mutably borrowed (because it is the one
    /// dispatching) is skipped. Unconsumed events are dropped.
    pub fn dispatch(&mut self, event: &Event) -> DispatchOutcome {
        self.prune();
        let mut outcome = DispatchOutcome::default();
        for sub in &self.subscribers {
            let Some(rc) = sub.handler.upgrade() else {
                continue;
            };
            let Ok(mut handler) = rc.try_borrow_mut() else {
                trace!(id = ?sub.id, "skipping handler that is already borrowed");
                continue;
            };
            outcome.invoked += 1;
            if handler.handle_event(event) {
                outcome.consumed_by = Some(sub.id);
                break;
            }
        }
        trace!(?outcome, "event dispatched");
        outcome
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::input::{Key, Modifiers};

    /// Counts calls and answers with a fixed verdict.
    struct Fixed {
        consume: bool,
        calls: usize,
    }

    impl Fixed {
        fn shared(consume: bool) -> Rc<RefCell<Fixed>> {
            Rc::new(RefCell::new(Fixed { consume, calls: 0 }))
        }
    }

    impl EventHandler for Fixed {
        fn handle_event(&mut self, _event: &Event) -> bool {
            self.calls += 1;
            self.consume
        }
    }

    fn key() -> Event {
        Event::key(Key::Enter, Modifiers::empty())
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn new_dispatcher_is_empty() {
        let disp = EventDispatcher::default();
        assert!(disp.is_empty());
        assert_eq!(disp.len(), 0);
    }

    // ── Chain of responsibility ──────────────────────────────────────

    #[test]
    fn first_consumer_wins() {
        let h1 = Fixed::shared(false);
        let h2 = Fixed::shared(true);
        let h3 = Fixed::shared(true);
        let mut disp = EventDispatcher::new();
        disp.subscribe(&h1);
        let second = disp.subscribe(&h2);
        disp.subscribe(&h3);

        let outcome = disp.dispatch(&key());
        assert_eq!(outcome.invoked, 2);
        assert_eq!(outcome.consumed_by, Some(second));
        assert_eq!(h1.borrow().calls, 1);
        assert_eq!(h2.borrow().calls, 1);
        assert_eq!(h3.borrow().calls, 0);
    }

    #[test]
    fn unconsumed_event_visits_everyone() {
        let h1 = Fixed::shared(false);
        let h2 = Fixed::shared(false);
        let mut disp = EventDispatcher::new();
        disp.subscribe(&h1);
        disp.subscribe(&h2);

        let outcome = disp.dispatch(&key());
        assert!(!outcome.consumed());
        assert_eq!(outcome.invoked, 2);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let h1 = Fixed::shared(true);
        let h2 = Fixed::shared(true);
        let mut disp = EventDispatcher::new();
        let first = disp.subscribe(&h1);
        disp.subscribe(&h2);

        assert!(disp.unsubscribe(first));
        assert!(!disp.unsubscribe(first));
        disp.dispatch(&key());
        assert_eq!(h1.borrow().calls, 0);
        assert_eq!(h2.borrow().calls, 1);
    }

    #[test]
    fn dropped_handler_is_never_invoked() {
        let h1 = Fixed::shared(true);
        let h2 = Fixed::shared(true);
        let mut disp = EventDispatcher::new();
        disp.subscribe(&h1);
        disp.subscribe(&h2);
        drop(h1);

        assert_eq!(disp.len(), 1);
        let outcome = disp.dispatch(&key());
        assert_eq!(outcome.invoked, 1);
        assert_eq!(h2.borrow().calls, 1);
    }

    #[test]
    fn dispatcher_does_not_keep_handlers_alive() {
        let h = Fixed::shared(false);
        let mut disp = EventDispatcher::new();
        disp.subscribe(&h);
        assert_eq!(Rc::strong_count(&h), 1);
    }

    #[test]
    fn borrowed_handler_is_skipped() {
        let busy = Fixed::shared(true);
        let next = Fixed::shared(true);
        let mut disp = EventDispatcher::new();
        disp.subscribe(&busy);
        disp.subscribe(&next);

        let _guard = busy.borrow_mut();
        let outcome = disp.dispatch(&key());
        assert_eq!(outcome.invoked, 1);
        assert_eq!(next.borrow().calls, 1);
    }

    #[test]
    fn subscribe_shared_handler() {
        let h: SharedHandler = Fixed::shared(true);
        let mut disp = EventDispatcher::new();
        let id = disp.subscribe_shared(&h);
        assert_eq!(disp.dispatch(&key()).consumed_by, Some(id));
    }
}
