#![forbid(unsafe_code)]

//! Producer-side constructors: subjects, external-source adapters, and the
//! pre-ended primitives.
//!
//! [`stream`] / [`property`] return a subject pair: the observable plus an
//! [`Emitter`] that pushes events into it. Emitter pushes are transaction
//! roots — each one propagates through the whole dependent subgraph before
//! the push returns (re-entrant pushes queue behind the draining
//! transaction). Pushes while nobody is subscribed still update a Property's
//! current and the terminal state.
//!
//! [`stream_from`] is the integration point for external adapters (UI event
//! bridges and the like): the activation callback runs on the 0→1 subscriber
//! transition and hands back a [`Teardown`] that runs on 1→0.

use std::rc::{Rc, Weak};

use crate::event::Event;
use crate::scheduler;

use super::{Inner, Kind, Observable, Origin};

/// Weak producer handle for a subject observable.
///
/// Inert once the observable is dropped or ended: pushes become no-ops
/// rather than errors.
pub struct Emitter<V, E> {
    target: Weak<Inner<V, E>>,
}

impl<V, E> Clone for Emitter<V, E> {
    fn clone(&self) -> Self {
        Emitter {
            target: Weak::clone(&self.target),
        }
    }
}

impl<V, E> Emitter<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn new(observable: &Observable<V, E>) -> Self {
        Emitter {
            target: Rc::downgrade(&observable.inner),
        }
    }

    /// Push a value. Opens a transaction, or queues behind the current one.
    pub fn emit(&self, value: V) {
        if let Some(inner) = self.target.upgrade() {
            let target = Observable::from_inner(inner);
            scheduler::run_root(move || target.emit_value(value));
        }
    }

    /// Push an error.
    pub fn error(&self, error: E) {
        if let Some(inner) = self.target.upgrade() {
            let target = Observable::from_inner(inner);
            scheduler::run_root(move || target.emit_error(error));
        }
    }

    /// Push the terminal `End`.
    pub fn end(&self) {
        if let Some(inner) = self.target.upgrade() {
            let target = Observable::from_inner(inner);
            scheduler::run_root(move || target.emit_end());
        }
    }

    /// Push a whole event.
    pub fn event(&self, event: Event<V, E>) {
        match event {
            Event::Value(v) => self.emit(v),
            Event::Error(e) => self.error(e),
            Event::End => self.end(),
        }
    }

    /// Whether the target observable is still alive and not ended.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|inner| !Observable::from_inner(inner).is_ended())
    }
}

impl<V, E> std::fmt::Debug for Emitter<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("live", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// A Stream subject: the observable plus its producer handle.
pub fn stream<V, E>() -> (Observable<V, E>, Emitter<V, E>)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let observable = Observable::new(Kind::Stream, 0, None);
    let emitter = Emitter::new(&observable);
    (observable, emitter)
}

/// A Property subject: the observable plus its producer handle.
pub fn property<V, E>() -> (Observable<V, E>, Emitter<V, E>)
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    let observable = Observable::new(Kind::Property, 0, None);
    let emitter = Emitter::new(&observable);
    (observable, emitter)
}

/// A Stream that is already ended: every subscriber observes `End` alone.
pub fn never<V, E>() -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    Observable::ended(Kind::Stream, None)
}

/// An ended Property holding `value` as its current: every subscriber
/// observes the value, then `End`.
pub fn constant<V, E>(value: V) -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    Observable::ended(Kind::Property, Some(value))
}

/// A Stream delivering `error` then `End` to its first activation.
///
/// Errors are never cached as a current, so unlike [`constant`] the error is
/// observed only by subscribers present at first activation; later
/// subscribers observe `End` alone.
pub fn constant_error<V, E>(error: E) -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    struct ErrorOnce<E>(Option<E>);
    impl<V: Clone + 'static, E: Clone + 'static> Origin<V, E> for ErrorOnce<E> {
        fn activate(&mut self, out: &Observable<V, E>) {
            if let Some(error) = self.0.take() {
                out.emit_error(error);
            }
            out.emit_end();
        }
        fn deactivate(&mut self) {}
    }
    Observable::new(Kind::Stream, 0, Some(Box::new(ErrorOnce(Some(error)))))
}

/// Deactivation hook returned by a [`stream_from`] activation callback.
pub struct Teardown(Option<Box<dyn FnOnce()>>);

impl Teardown {
    /// Run `f` when the observable deactivates.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Teardown(Some(Box::new(f)))
    }

    /// No deactivation work.
    #[must_use]
    pub fn none() -> Self {
        Teardown(None)
    }

    fn run(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

struct ExternalOrigin<F> {
    on_activation: F,
    teardown: Option<Teardown>,
}

impl<V, E, F> Origin<V, E> for ExternalOrigin<F>
where
    V: Clone + 'static,
    E: Clone + 'static,
    F: FnMut(Emitter<V, E>) -> Teardown,
{
    fn activate(&mut self, out: &Observable<V, E>) {
        self.teardown = Some((self.on_activation)(Emitter::new(out)));
    }

    fn deactivate(&mut self) {
        if let Some(mut teardown) = self.teardown.take() {
            teardown.run();
        }
    }
}

/// A Stream backed by an external source.
///
/// `on_activation` runs on every 0→1 subscriber transition; the returned
/// [`Teardown`] runs on the matching 1→0 transition (or on `End`). This is
/// the sole integration point adapters need: wire the native event source to
/// the provided [`Emitter`] and undo the wiring in the teardown.
pub fn stream_from<V, E, F>(on_activation: F) -> Observable<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
    F: FnMut(Emitter<V, E>) -> Teardown + 'static,
{
    Observable::new(
        Kind::Stream,
        0,
        Some(Box::new(ExternalOrigin {
            on_activation,
            teardown: None,
        })),
    )
}
