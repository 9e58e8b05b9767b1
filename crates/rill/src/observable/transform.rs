#![forbid(unsafe_code)]

//! Single-source conveniences: `map` and `filter`.
//!
//! These carry no cross-source synchronization concern, so they propagate
//! eagerly inside the transaction — the rank-ordered scheduler only matters
//! to multi-source combinators downstream of them. Both preserve the source
//! kind: mapping a Property yields a Property whose current tracks the
//! mapped replay.

use std::rc::Rc;

use crate::event::Event;

use super::{Observable, Origin, Subscription};

/// Forwards every source event through a per-event closure.
struct UnaryOrigin<V, E, T>
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    source: Observable<V, E>,
    on_event: Rc<dyn Fn(Event<V, E>, &Observable<T, E>)>,
    subscription: Option<Subscription>,
}

impl<V, E, T> Origin<T, E> for UnaryOrigin<V, E, T>
where
    V: Clone + 'static,
    E: Clone + 'static,
    T: Clone + 'static,
{
    fn activate(&mut self, out: &Observable<T, E>) {
        let weak = Rc::downgrade(&out.inner);
        let on_event = Rc::clone(&self.on_event);
        self.subscription = Some(self.source.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                on_event(event, &Observable::from_inner(inner));
            }
        }));
    }

    fn deactivate(&mut self) {
        self.subscription = None;
    }
}

impl<V, E> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    fn unary<T: Clone + 'static>(
        &self,
        on_event: impl Fn(Event<V, E>, &Observable<T, E>) + 'static,
    ) -> Observable<T, E> {
        Observable::new(
            self.kind(),
            self.rank() + 1,
            Some(Box::new(UnaryOrigin {
                source: self.clone(),
                on_event: Rc::new(on_event),
                subscription: None,
            })),
        )
    }

    /// Transform every value with `f`. Errors and `End` pass through
    /// untouched; the result's kind matches the source's.
    pub fn map<T: Clone + 'static>(&self, f: impl Fn(&V) -> T + 'static) -> Observable<T, E> {
        self.unary(move |event, out| match event {
            Event::Value(v) => out.emit_value(f(&v)),
            Event::Error(e) => out.emit_error(e),
            Event::End => out.emit_end(),
        })
    }

    /// Keep only values matching `predicate`. Errors and `End` pass through.
    pub fn filter(&self, predicate: impl Fn(&V) -> bool + 'static) -> Observable<V, E> {
        self.unary(move |event, out| match event {
            Event::Value(v) => {
                if predicate(&v) {
                    out.emit_value(v);
                }
            }
            Event::Error(e) => out.emit_error(e),
            Event::End => out.emit_end(),
        })
    }
}
