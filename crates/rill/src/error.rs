#![forbid(unsafe_code)]

//! Construction-time errors.
//!
//! These are raised synchronously when a combinator is built, never delivered
//! as [`Event::Error`](crate::Event::Error) — data-channel errors flow through
//! the pipeline instead and are not represented here.

use std::fmt;

use thiserror::Error;

/// The shape of a combine source group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Ordered, positionally-indexed sources.
    List,
    /// Key-named sources.
    Named,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::List => f.write_str("list"),
            Shape::Named => f.write_str("named"),
        }
    }
}

/// Error building a [`combine`](crate::combine) pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombineError {
    /// The active and passive source groups were given different shapes.
    /// Both must be list-shaped or both name-shaped.
    #[error("active and passive source groups have mismatched shapes ({active} vs {passive})")]
    ShapeMismatch {
        /// Shape of the active group.
        active: Shape,
        /// Shape of the passive group.
        passive: Shape,
    },
}
