#![forbid(unsafe_code)]

//! The tagged event delivered to every subscriber.
//!
//! `End` is terminal: once an observable has delivered it, no further events
//! are observed on that observable. Errors are a parallel channel — they
//! never touch a Property's cached current and are never fed to combinator
//! projections.

/// One event on an observable: a value, an error, or the terminal end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<V, E> {
    /// A data value.
    Value(V),
    /// A recoverable error. Does not imply [`Event::End`].
    Error(E),
    /// Terminal marker. Nothing follows.
    End,
}

impl<V, E> Event<V, E> {
    /// Whether this is a `Value` event.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Event::Value(_))
    }

    /// Whether this is an `Error` event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }

    /// Whether this is the terminal `End` event.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Event::End)
    }

    /// The value payload, if any.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Event::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The error payload, if any.
    #[must_use]
    pub fn into_error(self) -> Option<E> {
        match self {
            Event::Error(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Ev = Event<i32, &'static str>;

    #[test]
    fn accessors() {
        let v: Ev = Event::Value(3);
        let e: Ev = Event::Error("boom");
        let end: Ev = Event::End;

        assert!(v.is_value() && !v.is_error() && !v.is_end());
        assert!(e.is_error());
        assert!(end.is_end());

        assert_eq!(v.into_value(), Some(3));
        assert_eq!(e.into_error(), Some("boom"));
        assert_eq!(Ev::End.into_value(), None);
    }
}
