#![forbid(unsafe_code)]

//! Push-based reactive streams with glitch-free combinators.
//!
//! `rill` models event pipelines as graphs of [`Observable`]s. An observable
//! is either a *Stream* (transient events, subscribers see only what happens
//! after they subscribe) or a *Property* (a stream that retains its latest
//! value and replays it synchronously to new subscribers). Observables are
//! inert until their first subscriber arrives, at which point they lazily
//! subscribe to their own sources; when the last subscriber detaches, the
//! whole unused pipeline tears itself down again.
//!
//! # Architecture
//!
//! - [`Event`]: the tagged event delivered everywhere — `Value`, `Error`, or
//!   the terminal `End`.
//! - [`Observable`]: shared single-threaded state (`Rc`/`RefCell`) holding
//!   the ordered subscriber list, the activation state machine, and the
//!   Property current-value cache. [`Subscription`] is an RAII detach guard.
//! - `scheduler` (crate-internal): a thread-local, rank-ordered transaction
//!   queue. One root emission opens one *transaction*; multi-source
//!   combinators buffer sibling updates and flush exactly once per
//!   transaction, in topological rank order, so fan-in nodes never observe
//!   half-updated snapshots of their sources.
//! - [`combine`]: N-ary fan-in over active and passive source groups, with
//!   list- and name-shaped variants and an optional projection.
//! - [`Observable::filter_by`]: two-source gate driven by the secondary's
//!   last [`Truthy`] value.
//!
//! # Invariants
//!
//! 1. `End` is terminal and irreversible.
//! 2. A Property's current, once set, is never cleared by `Error` or `End`.
//! 3. A combinator emits at most one downstream event per transaction,
//!    however many of its sources updated within it.
//! 4. Subscribers are notified in registration order.
//! 5. Errors pass through multi-source operators verbatim: no projection,
//!    no effect on any cached value state.
//!
//! # Concurrency
//!
//! There is none. All propagation triggered by one root emission runs to
//! completion before the emitting call returns. Re-entrant root emissions
//! made from observer callbacks are queued and run as fresh transactions
//! after the current one drains.

pub mod combinator;
pub mod error;
pub mod event;
pub mod observable;
pub(crate) mod scheduler;
pub mod truthy;

pub use combinator::{Combined, Sources, combine, combine_values};
pub use error::{CombineError, Shape};
pub use event::Event;
pub use observable::{
    Emitter, Kind, Observable, Observer, Subscription, Teardown, constant, constant_error, never,
    property, stream, stream_from,
};
pub use truthy::Truthy;
