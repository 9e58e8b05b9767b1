#![forbid(unsafe_code)]

//! The Observable core: subscription bookkeeping, the activation state
//! machine, and the Property current-value cache.
//!
//! # Design
//!
//! [`Observable<V, E>`] is a cheap-clone handle (`Rc`) over shared
//! single-threaded interior state. Cloning a handle never copies pipeline
//! state; all handles observe the same subscriber list, activation state,
//! and current-value cache.
//!
//! An observable is constructed inert. The 0→1 subscriber transition
//! *activates* it: its origin (the operator- or adapter-specific behavior
//! behind it) subscribes to its own sources, recursively activating them.
//! The 1→0 transition *deactivates* it, releasing the upstream
//! subscriptions, which tears down an unused pipeline transitively. Only
//! those two transitions have side effects; intermediate subscriber-count
//! changes are pure bookkeeping.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Activation side effects fire exactly once per 0→1 transition; the
//!    `Activating` state guards against re-entrant activation while replay
//!    events are being delivered.
//! 3. A Property delivers its retained current synchronously to a new
//!    subscriber only, and only if activation replay did not already deliver
//!    an event to that subscriber.
//! 4. `End` is terminal: the observable detaches all subscribers, releases
//!    its sources, and every later subscriber observes only the terminal
//!    replay (current, if a Property holds one, then `End`).
//! 5. `Error` never writes the current-value cache.
//!
//! # Failure modes
//!
//! - Observer callbacks that panic unwind through the dispatch pass; the
//!   engine holds no lock state, so nothing is poisoned, but same-transaction
//!   deliveries after the panic point are lost.
//! - Dropping every handle to an idle observable frees it; an *active*
//!   pipeline is kept alive by its downstream subscriptions until the last
//!   one detaches.

mod emitter;
mod subscription;
mod transform;

pub use emitter::{Emitter, Teardown, constant, constant_error, never, property, stream,
    stream_from};
pub use subscription::Subscription;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::event::Event;
use crate::scheduler;

/// Which flavor of observable a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// No retained value; subscribers see only events emitted after they
    /// subscribe.
    Stream,
    /// Retains the latest value ("current"), replayed synchronously to new
    /// subscribers.
    Property,
}

/// Activation lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActivationState {
    Idle,
    Activating,
    Active,
    Ended,
}

/// Operator- or adapter-specific behavior behind an observable: what to do
/// when it gains its first subscriber and loses its last one.
pub(crate) trait Origin<V, E> {
    /// Subscribe to upstream sources. Replay events may be delivered to
    /// `out`'s subscribers synchronously from inside this call.
    fn activate(&mut self, out: &Observable<V, E>);

    /// Release upstream subscriptions.
    fn deactivate(&mut self);
}

struct SubscriberSlot<V, E> {
    id: u64,
    /// Shared with the owning [`Subscription`]; set on detach and on `End`.
    detached: Rc<Cell<bool>>,
    /// True until the first event is delivered to this subscriber. Used to
    /// decide whether the Property current replay is still owed.
    fresh: Rc<Cell<bool>>,
    callback: Rc<RefCell<dyn FnMut(Event<V, E>)>>,
}

impl<V, E> Clone for SubscriberSlot<V, E> {
    fn clone(&self) -> Self {
        SubscriberSlot {
            id: self.id,
            detached: Rc::clone(&self.detached),
            fresh: Rc::clone(&self.fresh),
            callback: Rc::clone(&self.callback),
        }
    }
}

pub(crate) struct Inner<V, E> {
    id: u64,
    kind: Kind,
    /// Topological depth: strictly greater than every source's rank.
    rank: u64,
    state: Cell<ActivationState>,
    current: RefCell<Option<V>>,
    subscribers: RefCell<Vec<SubscriberSlot<V, E>>>,
    origin: RefCell<Option<Box<dyn Origin<V, E>>>>,
    next_subscriber_id: Cell<u64>,
}

thread_local! {
    static NEXT_OBSERVABLE_ID: Cell<u64> = const { Cell::new(0) };
}

/// A push-based event source: a Stream or a Property.
///
/// Handles are cheap to clone and all refer to the same underlying state.
pub struct Observable<V, E> {
    pub(crate) inner: Rc<Inner<V, E>>,
}

impl<V, E> Clone for Observable<V, E> {
    fn clone(&self) -> Self {
        Observable {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V, E> fmt::Debug for Observable<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("rank", &self.inner.rank)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

/// Observer-record subscription form: optional per-channel hooks.
///
/// All hooks default to no-ops, so an implementation overrides only the
/// channels it cares about.
pub trait Observer<V, E> {
    /// Called per [`Event::Value`].
    fn value(&mut self, _value: V) {}
    /// Called per [`Event::Error`].
    fn error(&mut self, _error: E) {}
    /// Called once, on [`Event::End`].
    fn end(&mut self) {}
}

impl<V, E> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn new(kind: Kind, rank: u64, origin: Option<Box<dyn Origin<V, E>>>) -> Self {
        Observable {
            inner: Rc::new(Inner {
                id: NEXT_OBSERVABLE_ID.with(|c| {
                    let id = c.get();
                    c.set(id + 1);
                    id
                }),
                kind,
                rank,
                state: Cell::new(ActivationState::Idle),
                current: RefCell::new(None),
                subscribers: RefCell::new(Vec::new()),
                origin: RefCell::new(origin),
                next_subscriber_id: Cell::new(0),
            }),
        }
    }

    /// Pre-ended constructor: terminal from the start, optionally with a
    /// retained current.
    pub(crate) fn ended(kind: Kind, current: Option<V>) -> Self {
        let obs = Observable::new(kind, 0, None);
        *obs.inner.current.borrow_mut() = current;
        obs.inner.state.set(ActivationState::Ended);
        obs
    }

    pub(crate) fn from_inner(inner: Rc<Inner<V, E>>) -> Self {
        Observable { inner }
    }

    /// Stream or Property.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Whether this is a Stream-kind observable.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.inner.kind == Kind::Stream
    }

    /// Whether this is a Property-kind observable.
    #[must_use]
    pub fn is_property(&self) -> bool {
        self.inner.kind == Kind::Property
    }

    /// Whether the terminal `End` has been delivered.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.inner.state.get() == ActivationState::Ended
    }

    /// Whether the observable currently has subscribers holding its sources
    /// active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.inner.state.get(),
            ActivationState::Activating | ActivationState::Active
        )
    }

    /// A clone of the retained current value, if this is a Property that has
    /// seen one. Survives `End`.
    #[must_use]
    pub fn current(&self) -> Option<V> {
        self.inner.current.borrow().clone()
    }

    pub(crate) fn rank(&self) -> u64 {
        self.inner.rank
    }

    /// Register `callback` for all subsequent events.
    ///
    /// If this is the first subscriber, the observable activates —
    /// subscribes to its own sources, recursively — before this call
    /// returns, and any synchronous replay (a Property current, terminal
    /// `End`) is delivered inside the call. Delivery to multiple subscribers
    /// always preserves registration order.
    pub fn subscribe(&self, callback: impl FnMut(Event<V, E>) + 'static) -> Subscription {
        let callback: Rc<RefCell<dyn FnMut(Event<V, E>)>> = Rc::new(RefCell::new(callback));
        let inner = &self.inner;

        if inner.state.get() == ActivationState::Ended {
            // Terminal replay only; no registration, no reactivation.
            if inner.kind == Kind::Property {
                let current = inner.current.borrow().clone();
                if let Some(v) = current {
                    (callback.borrow_mut())(Event::Value(v));
                }
            }
            (callback.borrow_mut())(Event::End);
            return Subscription::terminal();
        }

        let id = inner.next_subscriber_id.get();
        inner.next_subscriber_id.set(id + 1);
        let detached = Rc::new(Cell::new(false));
        let fresh = Rc::new(Cell::new(true));
        inner.subscribers.borrow_mut().push(SubscriberSlot {
            id,
            detached: Rc::clone(&detached),
            fresh: Rc::clone(&fresh),
            callback: Rc::clone(&callback),
        });

        let first = inner.subscribers.borrow().len() == 1;
        if first {
            self.activate();
        }

        // Property current replay, owed to this subscriber alone unless
        // activation replay already delivered something to it.
        if inner.kind == Kind::Property && fresh.get() && !detached.get() {
            let current = inner.current.borrow().clone();
            if let Some(v) = current {
                fresh.set(false);
                (callback.borrow_mut())(Event::Value(v));
            }
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(
            detached,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut subscribers = inner.subscribers.borrow_mut();
                    if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
                        subscribers.remove(pos);
                    }
                    let empty = subscribers.is_empty();
                    drop(subscribers);
                    if empty {
                        Observable::from_inner(inner).deactivate();
                    }
                }
            }),
        )
    }

    /// Subscribe with an [`Observer`] record instead of a single closure.
    pub fn subscribe_observer(&self, mut observer: impl Observer<V, E> + 'static) -> Subscription {
        self.subscribe(move |event| match event {
            Event::Value(v) => observer.value(v),
            Event::Error(e) => observer.error(e),
            Event::End => observer.end(),
        })
    }

    fn activate(&self) {
        let inner = &self.inner;
        if inner.state.get() != ActivationState::Idle {
            return;
        }
        inner.state.set(ActivationState::Activating);
        tracing::debug!(
            id = inner.id,
            kind = ?inner.kind,
            rank = inner.rank,
            "activating"
        );
        scheduler::transact(|| {
            let origin = inner.origin.borrow_mut().take();
            if let Some(mut origin) = origin {
                origin.activate(self);
                // The observable may have ended during replay; the origin
                // was checked out here, so release its sources now.
                if inner.state.get() == ActivationState::Ended {
                    origin.deactivate();
                }
                *inner.origin.borrow_mut() = Some(origin);
            }
            if inner.state.get() == ActivationState::Activating {
                inner.state.set(ActivationState::Active);
            }
        });
        // A subscriber may have detached again during replay.
        if inner.state.get() == ActivationState::Active && inner.subscribers.borrow().is_empty() {
            self.deactivate();
        }
    }

    fn deactivate(&self) {
        let inner = &self.inner;
        if inner.state.get() != ActivationState::Active {
            return;
        }
        inner.state.set(ActivationState::Idle);
        tracing::debug!(id = inner.id, "deactivating");
        let origin = inner.origin.borrow_mut().take();
        if let Some(mut origin) = origin {
            origin.deactivate();
            *inner.origin.borrow_mut() = Some(origin);
        }
    }

    fn dispatch(&self, event: Event<V, E>) {
        // Snapshot tolerates subscribe/unsubscribe from inside callbacks;
        // detach flags keep removed subscribers from hearing the tail of the
        // pass they were removed in.
        let snapshot: Vec<SubscriberSlot<V, E>> = self.inner.subscribers.borrow().clone();
        for slot in snapshot {
            if slot.detached.get() {
                continue;
            }
            slot.fresh.set(false);
            (slot.callback.borrow_mut())(event.clone());
        }
    }

    pub(crate) fn emit_value(&self, value: V) {
        let inner = &self.inner;
        if inner.state.get() == ActivationState::Ended {
            return;
        }
        if inner.kind == Kind::Property {
            *inner.current.borrow_mut() = Some(value.clone());
        }
        self.dispatch(Event::Value(value));
    }

    pub(crate) fn emit_error(&self, error: E) {
        if self.inner.state.get() == ActivationState::Ended {
            return;
        }
        self.dispatch(Event::Error(error));
    }

    pub(crate) fn emit_end(&self) {
        let inner = &self.inner;
        let state = inner.state.get();
        if state == ActivationState::Ended {
            return;
        }
        inner.state.set(ActivationState::Ended);
        tracing::debug!(id = inner.id, "ended");
        self.dispatch(Event::End);
        let slots: Vec<SubscriberSlot<V, E>> =
            inner.subscribers.borrow_mut().drain(..).collect();
        for slot in &slots {
            slot.detached.set(true);
        }
        // Release sources. During activation the origin is checked out by
        // `activate`, which performs this release itself.
        if state == ActivationState::Active {
            let origin = inner.origin.borrow_mut().take();
            if let Some(mut origin) = origin {
                origin.deactivate();
                *inner.origin.borrow_mut() = Some(origin);
            }
        }
    }
}
