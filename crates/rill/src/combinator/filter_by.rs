#![forbid(unsafe_code)]

//! Two-source gate: primary values pass while the secondary's last value is
//! truthy.
//!
//! The gate caches only the last truthiness seen from the secondary; it is
//! unset until the secondary's first value, and persists across
//! deactivation. Primary values arriving while the gate is unset or falsy
//! are dropped outright — never buffered. Errors from either source forward
//! downstream unconditionally.
//!
//! End rules: the result ends with the primary, or when the secondary ends
//! while the gate is unset or falsy (it can never open again). A secondary
//! ending with a truthy gate freezes the gate open.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::event::Event;
use crate::observable::{Inner, Observable, Origin, Subscription};
use crate::scheduler;
use crate::truthy::Truthy;

struct FilterByState<V> {
    rank: u64,
    /// Last truthiness from the secondary; `None` until its first value.
    gate: Option<bool>,
    /// Primary value awaiting this transaction's flush.
    pending: Option<V>,
    end_pending: bool,
    queued: bool,
}

struct FilterByOrigin<V, E, G> {
    primary: Observable<V, E>,
    secondary: Observable<G, E>,
    state: Rc<RefCell<FilterByState<V>>>,
    subscriptions: Vec<Subscription>,
}

impl<V, E, G> Origin<V, E> for FilterByOrigin<V, E, G>
where
    V: Clone + 'static,
    E: Clone + 'static,
    G: Truthy + Clone + 'static,
{
    fn activate(&mut self, out: &Observable<V, E>) {
        let weak = Rc::downgrade(&out.inner);

        let state = Rc::clone(&self.state);
        let out_weak = weak.clone();
        let primary = self.primary.subscribe(move |event| match event {
            Event::Value(value) => {
                state.borrow_mut().pending = Some(value);
                schedule_flush(&state, &out_weak);
            }
            Event::Error(error) => {
                if let Some(inner) = out_weak.upgrade() {
                    Observable::from_inner(inner).emit_error(error);
                }
            }
            Event::End => {
                state.borrow_mut().end_pending = true;
                schedule_flush(&state, &out_weak);
            }
        });

        let state = Rc::clone(&self.state);
        let secondary = self.secondary.subscribe(move |event| match event {
            Event::Value(gate) => {
                state.borrow_mut().gate = Some(gate.is_truthy());
            }
            Event::Error(error) => {
                if let Some(inner) = weak.upgrade() {
                    Observable::from_inner(inner).emit_error(error);
                }
            }
            Event::End => {
                let frozen_open = state.borrow().gate == Some(true);
                if !frozen_open {
                    // The gate can never open again.
                    state.borrow_mut().end_pending = true;
                    schedule_flush(&state, &weak);
                }
            }
        });

        self.subscriptions = vec![primary, secondary];
    }

    fn deactivate(&mut self) {
        self.subscriptions.clear();
        let mut state = self.state.borrow_mut();
        state.pending = None;
        state.end_pending = false;
        state.queued = false;
        // gate persists across activations
    }
}

fn schedule_flush<V, E>(state: &Rc<RefCell<FilterByState<V>>>, out: &Weak<Inner<V, E>>)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let rank = {
        let mut s = state.borrow_mut();
        if s.queued {
            return;
        }
        s.queued = true;
        s.rank
    };
    let state = Rc::clone(state);
    let out = out.clone();
    scheduler::schedule(rank, move || flush(&state, &out));
}

fn flush<V, E>(state: &Rc<RefCell<FilterByState<V>>>, out: &Weak<Inner<V, E>>)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let (value, ended) = {
        let mut s = state.borrow_mut();
        s.queued = false;
        let value = match s.pending.take() {
            Some(v) if s.gate == Some(true) => Some(v),
            _ => None, // dropped, not buffered
        };
        let ended = s.end_pending;
        s.end_pending = false;
        (value, ended)
    };
    let Some(inner) = out.upgrade() else { return };
    let output = Observable::from_inner(inner);
    if let Some(v) = value {
        output.emit_value(v);
    }
    if ended {
        output.emit_end();
    }
}

impl<V, E> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Gate this observable's values by `secondary`'s last truthy value.
    ///
    /// The result's kind matches `self`: filtering a Property yields a
    /// Property (whose current tracks the values that passed), filtering a
    /// Stream yields a Stream.
    pub fn filter_by<G>(&self, secondary: &Observable<G, E>) -> Observable<V, E>
    where
        G: Truthy + Clone + 'static,
    {
        let rank = self.rank().max(secondary.rank()) + 1;
        let state = Rc::new(RefCell::new(FilterByState {
            rank,
            gate: None,
            pending: None,
            end_pending: false,
            queued: false,
        }));
        Observable::new(
            self.kind(),
            rank,
            Some(Box::new(FilterByOrigin {
                primary: self.clone(),
                secondary: secondary.clone(),
                state,
                subscriptions: Vec::new(),
            })),
        )
    }
}
