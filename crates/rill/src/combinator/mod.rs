#![forbid(unsafe_code)]

//! Multi-source combinators.
//!
//! Source groups come in two shapes, fixed at construction: *list* (ordered,
//! positionally indexed) and *named* (string-keyed records). The active and
//! passive groups of one `combine` call must share a shape; a mismatch is a
//! construction error, never a runtime event.

mod combine;
mod filter_by;

pub use combine::{combine, combine_values};

use std::collections::BTreeMap;

use crate::error::Shape;
use crate::observable::Observable;

/// A combine source group: every source carries the same value and error
/// types, identified positionally or by key.
pub enum Sources<V, E> {
    /// Ordered sources; the combined tuple lists values in group order,
    /// actives before passives.
    List(Vec<Observable<V, E>>),
    /// Key-named sources; the combined record maps each key to its source's
    /// latest value.
    Named(Vec<(String, Observable<V, E>)>),
}

impl<V, E> Sources<V, E> {
    /// A list-shaped group.
    pub fn list(sources: impl IntoIterator<Item = Observable<V, E>>) -> Self {
        Sources::List(sources.into_iter().collect())
    }

    /// A name-shaped group.
    pub fn named<K: Into<String>>(
        sources: impl IntoIterator<Item = (K, Observable<V, E>)>,
    ) -> Self {
        Sources::Named(
            sources
                .into_iter()
                .map(|(key, source)| (key.into(), source))
                .collect(),
        )
    }

    /// An empty list-shaped group — the usual "no passive sources" argument.
    #[must_use]
    pub fn empty() -> Self {
        Sources::List(Vec::new())
    }

    /// Which shape this group carries.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Sources::List(_) => Shape::List,
            Sources::Named(_) => Shape::Named,
        }
    }

    /// Number of sources in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Sources::List(sources) => sources.len(),
            Sources::Named(sources) => sources.len(),
        }
    }

    /// Whether the group holds no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The combined tuple/record handed to a `combine` projection (and emitted
/// as-is by [`combine_values`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combined<V> {
    /// Values of a list-shaped combine, actives first, in group order.
    List(Vec<V>),
    /// Values of a name-shaped combine, keyed by source name.
    Named(BTreeMap<String, V>),
}

impl<V> Combined<V> {
    /// Positional access (list shape).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        match self {
            Combined::List(values) => values.get(index),
            Combined::Named(_) => None,
        }
    }

    /// Keyed access (named shape).
    #[must_use]
    pub fn get_named(&self, key: &str) -> Option<&V> {
        match self {
            Combined::List(_) => None,
            Combined::Named(values) => values.get(key),
        }
    }

    /// Number of combined values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Combined::List(values) => values.len(),
            Combined::Named(values) => values.len(),
        }
    }

    /// Whether the tuple/record is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The list payload, if list-shaped.
    #[must_use]
    pub fn into_list(self) -> Option<Vec<V>> {
        match self {
            Combined::List(values) => Some(values),
            Combined::Named(_) => None,
        }
    }

    /// The record payload, if name-shaped.
    #[must_use]
    pub fn into_named(self) -> Option<BTreeMap<String, V>> {
        match self {
            Combined::List(_) => None,
            Combined::Named(values) => Some(values),
        }
    }
}
