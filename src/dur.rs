use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// An exact duration in quarter-note units, kept as a reduced rational with
/// 64-bit terms. Durations produced by rhythm analysis are never negative, so
/// a single negative sentinel is enough to represent "not yet known": any
/// negative value observed after analysis means the quantity is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dur(Ratio<i64>);

impl Dur {
    /// Sentinel for durations that have not been assigned.
    pub const UNDEFINED: Dur = Dur(Ratio::new_raw(-1, 1));
    pub const ZERO: Dur = Dur(Ratio::new_raw(0, 1));

    /// Create a reduced rational duration. `denom` must be non-zero.
    pub fn new(numer: i64, denom: i64) -> Self {
        Self(Ratio::new(numer, denom))
    }

    pub fn from_int(n: i64) -> Self {
        Self(Ratio::from_integer(n))
    }

    pub fn numer(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denom(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_negative(&self) -> bool {
        *self.0.numer() < 0
    }

    pub fn is_positive(&self) -> bool {
        *self.0.numer() > 0
    }

    pub fn is_zero(&self) -> bool {
        *self.0.numer() == 0
    }

    pub fn is_nonnegative(&self) -> bool {
        *self.0.numer() >= 0
    }

    /// True when the value is the "not yet assigned" sentinel (or any other
    /// negative value left behind by an incomplete analysis).
    pub fn is_undefined(&self) -> bool {
        self.is_negative()
    }

    pub fn checked_add(&self, rhs: &Dur) -> Option<Dur> {
        self.0.checked_add(&rhs.0).map(Dur)
    }

    pub fn checked_sub(&self, rhs: &Dur) -> Option<Dur> {
        self.0.checked_sub(&rhs.0).map(Dur)
    }

    pub fn checked_mul(&self, rhs: &Dur) -> Option<Dur> {
        self.0.checked_mul(&rhs.0).map(Dur)
    }

    pub fn checked_div(&self, rhs: &Dur) -> Option<Dur> {
        if rhs.is_zero() {
            return None;
        }
        self.0.checked_div(&rhs.0).map(Dur)
    }
}

impl Add for Dur {
    type Output = Dur;
    fn add(self, rhs: Self) -> Self::Output {
        Dur(self.0 + rhs.0)
    }
}

impl AddAssign for Dur {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Dur {
    type Output = Dur;
    fn sub(self, rhs: Self) -> Self::Output {
        Dur(self.0 - rhs.0)
    }
}

impl Mul for Dur {
    type Output = Dur;
    fn mul(self, rhs: Self) -> Self::Output {
        Dur(self.0 * rhs.0)
    }
}

impl Div for Dur {
    type Output = Dur;
    fn div(self, rhs: Self) -> Self::Output {
        Dur(self.0 / rhs.0)
    }
}

impl Display for Dur {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let num = *self.0.numer();
        let den = *self.0.denom();
        write!(f, "{num}")?;
        if den != 1 {
            write!(f, "/{den}")?;
        }
        Ok(())
    }
}

impl Serialize for Dur {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction() {
        assert_eq!(Dur::new(2, 4), Dur::new(1, 2));
        assert_eq!(Dur::new(4, 4), Dur::from_int(1));
        assert_eq!(Dur::new(-3, -6), Dur::new(1, 2));
        assert_eq!(Dur::new(6, 4).to_string(), "3/2");
        assert_eq!(Dur::from_int(2).to_string(), "2");
    }

    #[test]
    fn test_sentinel() {
        assert!(Dur::UNDEFINED.is_undefined());
        assert!(Dur::UNDEFINED.is_negative());
        assert!(!Dur::ZERO.is_undefined());
        assert!(Dur::ZERO.is_nonnegative());
        assert!(!Dur::ZERO.is_positive());
        assert!(Dur::new(1, 4).is_positive());
    }

    #[test]
    fn test_arithmetic() {
        let a = Dur::new(1, 2);
        let b = Dur::new(1, 3);
        assert_eq!(a + b, Dur::new(5, 6));
        assert_eq!(a - b, Dur::new(1, 6));
        assert_eq!(a * b, Dur::new(1, 6));
        assert_eq!(a / b, Dur::new(3, 2));
        let mut c = a;
        c += b;
        assert_eq!(c, Dur::new(5, 6));
    }

    #[test]
    fn test_checked_overflow() {
        let big = Dur::from_int(i64::MAX);
        assert!(big.checked_add(&Dur::from_int(1)).is_none());
        assert!(big.checked_mul(&Dur::from_int(2)).is_none());
        assert_eq!(
            Dur::new(1, 2).checked_add(&Dur::new(1, 3)),
            Some(Dur::new(5, 6))
        );
        assert!(Dur::from_int(1).checked_div(&Dur::ZERO).is_none());
    }
}
