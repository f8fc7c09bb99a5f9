use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

//--------------------------------------     MinorUnits       ---------------------------------------------------------
/// An unsigned amount of money, expressed in the minor units of whatever currency the payment is labelled with
/// (cents, kopecks, ...). No rounding or currency conversion ever happens on these values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(u64);

op!(binary MinorUnits, Add, add);
op!(inplace MinorUnits, AddAssign, add_assign);

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<u64> for MinorUnits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Storage engines without an unsigned 64-bit column type hand amounts back as `i64`.
impl TryFrom<i64> for MinorUnits {
    type Error = MinorUnitsConversionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| MinorUnitsConversionError(format!("{value} is negative")))
    }
}

impl TryFrom<MinorUnits> for i64 {
    type Error = MinorUnitsConversionError;

    fn try_from(value: MinorUnits) -> Result<Self, Self::Error> {
        i64::try_from(value.0)
            .map_err(|_| MinorUnitsConversionError(format!("{} is too large to store as a signed integer", value.0)))
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `None` if the result would overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Returns `None` if the result would be negative.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checked_arithmetic() {
        let a = MinorUnits::from(100);
        let b = MinorUnits::from(50);
        assert_eq!(a.checked_sub(b), Some(MinorUnits::from(50)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(MinorUnits::from(u64::MAX).checked_add(MinorUnits::from(1)), None);
        assert_eq!(a + b, MinorUnits::from(150));
    }

    #[test]
    fn signed_conversions() {
        assert_eq!(MinorUnits::try_from(42i64).unwrap(), MinorUnits::from(42));
        assert!(MinorUnits::try_from(-1i64).is_err());
        assert_eq!(i64::try_from(MinorUnits::from(7)).unwrap(), 7);
        assert!(i64::try_from(MinorUnits::from(u64::MAX)).is_err());
    }

    #[test]
    fn sum_and_display() {
        let total: MinorUnits = [10u64, 20, 30].into_iter().map(MinorUnits::from).sum();
        assert_eq!(total.to_string(), "60");
    }

    #[test]
    fn serializes_as_a_bare_number() {
        let json = serde_json::to_string(&MinorUnits::from(250)).unwrap();
        assert_eq!(json, "250");
    }
}
