#![allow(dead_code)]

//! Shared helpers for the integration suites.

use std::cell::RefCell;
use std::rc::Rc;

use rill::{Emitter, Event, Observable, Subscription, property, stream};

pub type Log<V, E> = Rc<RefCell<Vec<Event<V, E>>>>;

/// Subscribe a recording sink; the log accumulates every delivered event.
pub fn record<V, E>(obs: &Observable<V, E>) -> (Log<V, E>, Subscription)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let sub = obs.subscribe(move |ev| sink.borrow_mut().push(ev));
    (log, sub)
}

pub fn taken<V: Clone, E: Clone>(log: &Log<V, E>) -> Vec<Event<V, E>> {
    log.borrow().clone()
}

/// A property that has already seen `value`.
pub fn property_with<V, E>(value: V) -> (Observable<V, E>, Emitter<V, E>)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let (p, ep) = property();
    ep.emit(value);
    (p, ep)
}

/// An ended property holding `value` as current.
pub fn ended_property_with<V, E>(value: V) -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let (p, ep) = property();
    ep.emit(value);
    ep.end();
    p
}

/// An ended stream (saw no values).
pub fn ended_stream<V, E>() -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let (s, es) = stream();
    es.end();
    s
}
