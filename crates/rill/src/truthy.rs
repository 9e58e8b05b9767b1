#![forbid(unsafe_code)]

//! Truthiness for gate values.
//!
//! [`filter_by`](crate::Observable::filter_by) forwards primary values only
//! while the secondary's last value is truthy. This trait pins down what
//! "truthy" means per type: zero, NaN, empty strings, and `None` are falsy.

/// Types usable as a `filter_by` gate value.
pub trait Truthy {
    /// Whether this value opens the gate.
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! impl_truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

impl_truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives() {
        assert!(true.is_truthy());
        assert!(!false.is_truthy());
        assert!(1i32.is_truthy());
        assert!(!0u64.is_truthy());
        assert!((-1i8).is_truthy());
        assert!(0.5f64.is_truthy());
        assert!(!0.0f64.is_truthy());
        assert!(!f64::NAN.is_truthy());
    }

    #[test]
    fn strings_and_options() {
        assert!("x".is_truthy());
        assert!(!"".is_truthy());
        assert!(String::from("x").is_truthy());
        assert!(Some(1).is_truthy());
        assert!(!Some(0).is_truthy());
        assert!(!None::<i32>.is_truthy());
    }
}
