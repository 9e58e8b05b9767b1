#![forbid(unsafe_code)]

//! Rank-ordered transaction scheduler.
//!
//! A *transaction* is the complete synchronous ripple of propagation caused
//! by one root emission. Single-source edges propagate eagerly, depth-first,
//! inside the transaction; multi-source combinators never emit from their
//! source handlers — they enqueue a flush task at their topological *rank*
//! and the drain runs queued tasks in non-decreasing `(rank, seq)` order.
//! A node's rank exceeds all of its sources' ranks (assigned at
//! construction), so a combinator flushes only after every same-transaction
//! source below it has settled, and emits at most once.
//!
//! Root emissions made re-entrantly from observer callbacks are deferred and
//! run as fresh transactions after the current one drains, preserving a
//! single global delivery order that is never interleaved mid-transaction.
//!
//! The scheduler is thread-local: the propagation model is single-threaded
//! cooperative, so there is no locking, only re-entrancy discipline. It
//! assumes the subscription graph is a DAG; operator construction from
//! already-built source handles cannot form a cycle.

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

struct Task {
    rank: u64,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.seq == other.seq
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rank, self.seq).cmp(&(other.rank, other.seq))
    }
}

struct Scheduler {
    in_transaction: bool,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Task>>,
    deferred_roots: VecDeque<Box<dyn FnOnce()>>,
}

impl Scheduler {
    const fn new() -> Self {
        Scheduler {
            in_transaction: false,
            next_seq: 0,
            queue: BinaryHeap::new(),
            deferred_roots: VecDeque::new(),
        }
    }
}

thread_local! {
    static SCHEDULER: RefCell<Scheduler> = const { RefCell::new(Scheduler::new()) };
}

/// Run `f` inside the current transaction, opening one if none is active.
///
/// Opening a transaction means: run `f`, drain the task queue in rank order,
/// then run any root emissions deferred while draining, each as its own
/// transaction. Nested calls just run `f` — the outermost caller drains.
pub(crate) fn transact(f: impl FnOnce()) {
    let nested = SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        if s.in_transaction {
            true
        } else {
            s.in_transaction = true;
            false
        }
    });
    if nested {
        f();
        return;
    }
    tracing::trace!("transaction open");
    f();
    drain();
    SCHEDULER.with(|s| s.borrow_mut().in_transaction = false);
    tracing::trace!("transaction drained");
    loop {
        let root = SCHEDULER.with(|s| s.borrow_mut().deferred_roots.pop_front());
        match root {
            Some(root) => transact(root),
            None => break,
        }
    }
}

/// Run a root emission: immediately if idle, deferred if a transaction is
/// already active (re-entrant emission from an observer callback).
pub(crate) fn run_root(f: impl FnOnce() + 'static) {
    let in_transaction = SCHEDULER.with(|s| s.borrow().in_transaction);
    if in_transaction {
        SCHEDULER.with(|s| s.borrow_mut().deferred_roots.push_back(Box::new(f)));
    } else {
        transact(f);
    }
}

/// Enqueue a combinator flush at `rank` for the current transaction.
pub(crate) fn schedule(rank: u64, run: impl FnOnce() + 'static) {
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        let seq = s.next_seq;
        s.next_seq += 1;
        s.queue.push(Reverse(Task {
            rank,
            seq,
            run: Box::new(run),
        }));
    });
}

fn drain() {
    loop {
        let task = SCHEDULER.with(|s| s.borrow_mut().queue.pop());
        match task {
            Some(Reverse(task)) => (task.run)(),
            None => break,
        }
    }
}
