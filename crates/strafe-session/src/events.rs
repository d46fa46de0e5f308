//! Ordered observer registry for lifecycle notifications.
//!
//! Subscribers run synchronously, in registration order, before the loader
//! continues with its next step. [`LifecycleObservers::clear`] drops every
//! subscriber; the loader calls it on destroy.
//!
//! A notification runs on a snapshot of the matching handlers, so a handler
//! may subscribe, unsubscribe, clear or trigger another notification. A
//! handler removed mid-notification is skipped if it has not run yet. A
//! handler that re-enters its own notification is not run again.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::state::SessionState;

/// Lifecycle notifications fired by the session loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Map loaded, gamemode not yet loaded.
    PreGameLoaded,
    /// Map and gamemode loaded.
    GameLoaded,
    /// About to tear the current game down.
    PreGameUnloaded,
    /// Current game torn down.
    GameUnloaded,
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type LifecycleHandler = Rc<RefCell<dyn FnMut()>>;
type StateHandler = Rc<RefCell<dyn FnMut(SessionState, SessionState)>>;

/// Subscribers for lifecycle events and state transitions.
#[derive(Default)]
pub struct LifecycleObservers {
    next_id: Cell<u64>,
    lifecycle: RefCell<Vec<(SubscriptionId, LifecycleEvent, LifecycleHandler)>>,
    state: RefCell<Vec<(SubscriptionId, StateHandler)>>,
}

impl LifecycleObservers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> SubscriptionId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        SubscriptionId(id)
    }

    /// Register `handler` for `event`.
    pub fn subscribe(&self, event: LifecycleEvent, handler: impl FnMut() + 'static) -> SubscriptionId {
        let id = self.allocate_id();
        let handler: LifecycleHandler = Rc::new(RefCell::new(handler));
        self.lifecycle.borrow_mut().push((id, event, handler));
        id
    }

    /// Register `handler` for every state transition, called with
    /// `(previous, current)`.
    pub fn subscribe_state(
        &self,
        handler: impl FnMut(SessionState, SessionState) + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_id();
        let handler: StateHandler = Rc::new(RefCell::new(handler));
        self.state.borrow_mut().push((id, handler));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let before = self.len();
        self.lifecycle.borrow_mut().retain(|(sub, _, _)| *sub != id);
        self.state.borrow_mut().retain(|(sub, _)| *sub != id);
        self.len() != before
    }

    /// Returns `true` while `id` is registered.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lifecycle.borrow().iter().any(|(sub, _, _)| *sub == id)
            || self.state.borrow().iter().any(|(sub, _)| *sub == id)
    }

    /// Invoke every subscriber of `event`, in registration order.
    pub fn fire(&self, event: LifecycleEvent) {
        tracing::debug!("Firing {event:?}");
        let handlers: Vec<_> = self
            .lifecycle
            .borrow()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(id, _, handler)| (*id, Rc::clone(handler)))
            .collect();

        for (id, handler) in handlers {
            if !self.is_subscribed(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(),
                Err(_) => tracing::debug!("Skipping re-entrant {event:?} handler"),
            }
        }
    }

    /// Invoke every state subscriber with a transition.
    pub fn state_changed(&self, previous: SessionState, current: SessionState) {
        let handlers: Vec<_> = self
            .state
            .borrow()
            .iter()
            .map(|(id, handler)| (*id, Rc::clone(handler)))
            .collect();

        for (id, handler) in handlers {
            if !self.is_subscribed(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(previous, current),
                Err(_) => tracing::debug!("Skipping re-entrant state handler"),
            }
        }
    }

    /// Drop every subscriber.
    pub fn clear(&self) {
        self.lifecycle.borrow_mut().clear();
        self.state.borrow_mut().clear();
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lifecycle.borrow().len() + self.state.borrow().len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
