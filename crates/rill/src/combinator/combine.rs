#![forbid(unsafe_code)]

//! N-ary fan-in over active and passive source groups.
//!
//! # Design
//!
//! One *binding* per source caches its latest value and ended flag. Value
//! events from **active** sources mark the combinator dirty and enqueue one
//! flush at its rank for the current transaction; the flush emits a single
//! projected tuple once every binding holds a value. Value events from
//! **passive** sources update their cache silently. Errors from any source
//! forward downstream synchronously, bypassing the projection and every
//! cache. Binding caches persist across deactivation, so Property sources
//! replaying their currents on a later activation synthesize at most one
//! fresh emission per activation.
//!
//! The combinator ends exactly when a further emission is structurally
//! impossible: every active source has ended (a group with no active sources
//! is terminal at first activation). Passive ends never end it.
//!
//! # Invariants
//!
//! 1. At most one downstream Value per transaction, however many sources
//!    updated within it (`queued`/`dirty` guards + rank-ordered flush).
//! 2. The projection only ever sees a fully-populated tuple.
//! 3. A same-flush Value precedes `End`.
//! 4. Named-shape key collisions between groups resolve to the active
//!    binding; the passive twin is never subscribed.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use crate::error::{CombineError, Shape};
use crate::event::Event;
use crate::observable::{Inner, Kind, Observable, Origin, Subscription};
use crate::scheduler;

use super::{Combined, Sources};

struct Binding<V, E> {
    name: Option<String>,
    source: Observable<V, E>,
    passive: bool,
    last: Option<V>,
    ended: bool,
    subscription: Option<Subscription>,
}

struct CombineState<V, E, T> {
    shape: Shape,
    rank: u64,
    bindings: Vec<Binding<V, E>>,
    project: Rc<dyn Fn(Combined<V>) -> T>,
    /// An active source delivered a value this transaction.
    dirty: bool,
    /// A flush is already enqueued this transaction.
    queued: bool,
}

struct CombineOrigin<V, E, T> {
    state: Rc<RefCell<CombineState<V, E, T>>>,
}

impl<V, E, T> Origin<T, E> for CombineOrigin<V, E, T>
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    fn activate(&mut self, out: &Observable<T, E>) {
        let weak = Rc::downgrade(&out.inner);
        let count = self.state.borrow().bindings.len();
        for index in 0..count {
            // Subscribing can replay synchronously into the handler, so no
            // state borrow may be held across the call.
            let source = self.state.borrow().bindings[index].source.clone();
            let state = Rc::clone(&self.state);
            let out_weak = weak.clone();
            let subscription =
                source.subscribe(move |event| on_source_event(&state, &out_weak, index, event));
            self.state.borrow_mut().bindings[index].subscription = Some(subscription);
        }
        let has_active = self.state.borrow().bindings.iter().any(|b| !b.passive);
        if !has_active {
            // No active source can ever trigger an emission; terminal now.
            schedule_flush(&self.state, &weak);
        }
    }

    fn deactivate(&mut self) {
        let mut state = self.state.borrow_mut();
        for binding in &mut state.bindings {
            binding.subscription = None;
        }
        state.dirty = false;
        state.queued = false;
    }
}

fn on_source_event<V, E, T>(
    state: &Rc<RefCell<CombineState<V, E, T>>>,
    out: &Weak<Inner<T, E>>,
    index: usize,
    event: Event<V, E>,
) where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    match event {
        Event::Value(value) => {
            let mut s = state.borrow_mut();
            s.bindings[index].last = Some(value);
            let active = !s.bindings[index].passive;
            if active {
                s.dirty = true;
            }
            drop(s);
            if active {
                schedule_flush(state, out);
            }
        }
        Event::Error(error) => {
            // Structurally transparent: no projection, no cache writes.
            if let Some(inner) = out.upgrade() {
                Observable::from_inner(inner).emit_error(error);
            }
        }
        Event::End => {
            let mut s = state.borrow_mut();
            s.bindings[index].ended = true;
            let terminal = !s.bindings[index].passive
                && s.bindings.iter().filter(|b| !b.passive).all(|b| b.ended);
            drop(s);
            if terminal {
                schedule_flush(state, out);
            }
        }
    }
}

fn schedule_flush<V, E, T>(state: &Rc<RefCell<CombineState<V, E, T>>>, out: &Weak<Inner<T, E>>)
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
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

fn flush<V, E, T>(state: &Rc<RefCell<CombineState<V, E, T>>>, out: &Weak<Inner<T, E>>)
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    let mut assembled = None;
    let ended;
    {
        let mut s = state.borrow_mut();
        s.queued = false;
        if s.dirty {
            s.dirty = false;
            if s.bindings.iter().all(|b| b.last.is_some()) {
                assembled = Some((assemble(&s), Rc::clone(&s.project)));
            }
        }
        ended = s.bindings.iter().filter(|b| !b.passive).all(|b| b.ended);
    }
    let Some(inner) = out.upgrade() else { return };
    let output = Observable::from_inner(inner);
    if let Some((combined, project)) = assembled {
        // Projection is user code; the state borrow is released above.
        output.emit_value(project(combined));
    }
    if ended {
        output.emit_end();
    }
}

fn assemble<V, E, T>(state: &CombineState<V, E, T>) -> Combined<V>
where
    V: Clone,
{
    match state.shape {
        Shape::List => Combined::List(
            state
                .bindings
                .iter()
                .map(|b| {
                    b.last
                        .clone()
                        .expect("flush assembles only when every binding holds a value")
                })
                .collect(),
        ),
        Shape::Named => Combined::Named(
            state
                .bindings
                .iter()
                .map(|b| {
                    (
                        b.name
                            .clone()
                            .expect("named-shape bindings always carry a key"),
                        b.last
                            .clone()
                            .expect("flush assembles only when every binding holds a value"),
                    )
                })
                .collect(),
        ),
    }
}

/// Combine the latest values of several sources into one Stream.
///
/// Value events from `active` sources trigger emissions (once every source
/// has delivered at least one value); `passive` sources only refresh their
/// cached slot. Both groups must share a shape — list with list, named with
/// named — or construction fails with [`CombineError::ShapeMismatch`]. For
/// the named shape, a key present in both groups belongs to the active
/// group; the passive source under that key is ignored entirely.
///
/// The result is always Stream-kind, though a subscriber activating a
/// combinator whose sources all hold values receives one synthesized
/// current-replay emission.
pub fn combine<V, E, T>(
    active: Sources<V, E>,
    passive: Sources<V, E>,
    projection: impl Fn(Combined<V>) -> T + 'static,
) -> Result<Observable<T, E>, CombineError>
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    let (shape, bindings) = match (active, passive) {
        (Sources::List(active), Sources::List(passive)) => {
            let mut bindings = Vec::with_capacity(active.len() + passive.len());
            for source in active {
                bindings.push(binding(None, source, false));
            }
            for source in passive {
                bindings.push(binding(None, source, true));
            }
            (Shape::List, bindings)
        }
        (Sources::Named(active), Sources::Named(passive)) => {
            let taken: BTreeSet<String> = active.iter().map(|(name, _)| name.clone()).collect();
            let mut bindings = Vec::with_capacity(active.len() + passive.len());
            for (name, source) in active {
                bindings.push(binding(Some(name), source, false));
            }
            for (name, source) in passive {
                if taken.contains(&name) {
                    continue; // active group owns this key outright
                }
                bindings.push(binding(Some(name), source, true));
            }
            (Shape::Named, bindings)
        }
        (active, passive) => {
            return Err(CombineError::ShapeMismatch {
                active: active.shape(),
                passive: passive.shape(),
            });
        }
    };

    let rank = bindings
        .iter()
        .map(|b| b.source.rank())
        .max()
        .unwrap_or(0)
        + 1;
    tracing::debug!(sources = bindings.len(), ?shape, rank, "combine built");
    let state = Rc::new(RefCell::new(CombineState {
        shape,
        rank,
        bindings,
        project: Rc::new(projection),
        dirty: false,
        queued: false,
    }));
    Ok(Observable::new(
        Kind::Stream,
        rank,
        Some(Box::new(CombineOrigin { state })),
    ))
}

fn binding<V, E>(name: Option<String>, source: Observable<V, E>, passive: bool) -> Binding<V, E> {
    Binding {
        name,
        source,
        passive,
        last: None,
        ended: false,
        subscription: None,
    }
}

/// [`combine`] with the identity projection: emits the raw tuple/record.
pub fn combine_values<V, E>(
    active: Sources<V, E>,
    passive: Sources<V, E>,
) -> Result<Observable<Combined<V>, E>, CombineError>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    combine(active, passive, |combined| combined)
}

impl<V, E> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Binary combine: `self` and `other` both active, projected pairwise.
    pub fn combine_with<T: Clone + 'static>(
        &self,
        other: &Observable<V, E>,
        f: impl Fn(&V, &V) -> T + 'static,
    ) -> Observable<T, E> {
        combine(
            Sources::list([self.clone(), other.clone()]),
            Sources::empty(),
            move |combined| {
                let Combined::List(values) = combined else {
                    unreachable!("list-shaped combine assembles list tuples")
                };
                f(&values[0], &values[1])
            },
        )
        .expect("two list-shaped groups always share a shape")
    }
}
