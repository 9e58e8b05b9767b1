#![forbid(unsafe_code)]

//! RAII detach guard returned by [`Observable::subscribe`].
//!
//! Dropping (or explicitly unsubscribing) removes the callback from the
//! observable's subscriber list; the 1→0 transition then deactivates the
//! observable, releasing its own upstream subscriptions transitively.
//!
//! [`Observable::subscribe`]: super::Observable::subscribe

use std::cell::Cell;
use std::rc::Rc;

/// Handle binding one subscriber callback to one observable.
///
/// Detach happens at most once, whether via [`unsubscribe`](Self::unsubscribe)
/// or `Drop`. A subscription whose observable has already delivered `End` is
/// inert from the start.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detached: Rc<Cell<bool>>,
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(detached: Rc<Cell<bool>>, remove: Box<dyn FnOnce()>) -> Self {
        Subscription {
            detached,
            remove: Some(remove),
        }
    }

    /// A subscription to an already-ended observable: never attached.
    pub(crate) fn terminal() -> Self {
        Subscription {
            detached: Rc::new(Cell::new(true)),
            remove: None,
        }
    }

    /// Whether the callback is still registered. Becomes false on detach and
    /// when the observable ends.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.detached.get()
    }

    /// Detach now instead of at drop time.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        self.detached.set(true);
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
