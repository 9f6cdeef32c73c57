use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const THAI_BAHT_CURRENCY_CODE: &str = "THB";
pub const THAI_BAHT_CURRENCY_CODE_LOWER: &str = "thb";

//--------------------------------------        Baht         ---------------------------------------------------------
/// A whole-baht amount. Storefront prices and delivery fees are always whole baht; the payment processor works in
/// satang (1/100 baht), see [`Baht::to_satang`].
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Baht(i64);

op!(binary Baht, Add, add);
op!(binary Baht, Sub, sub);
op!(inplace Baht, AddAssign, add_assign);
op!(inplace Baht, SubAssign, sub_assign);
op!(unary Baht, Neg, neg);

impl Sum for Baht {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in baht: {0}")]
pub struct BahtConversionError(String);

impl From<i64> for Baht {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Baht {
    type Error = BahtConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| BahtConversionError(format!("Value {value} is too large to convert to Baht")))
    }
}

impl Display for Baht {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "฿{}", self.0)
    }
}

impl Baht {
    pub const fn zero() -> Self {
        Self(0)
    }

    /// For use in `const` items, where `From` is not available.
    pub const fn from_const(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The amount in satang, the minor unit used by the payment processor.
    pub fn to_satang(&self) -> i64 {
        self.0 * 100
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Baht::from(1290);
        let b = Baht::from(400);
        assert_eq!(a + b, Baht::from(1690));
        assert_eq!(a - b, Baht::from(890));
        assert_eq!(-b, Baht::from(-400));
        let mut c = a;
        c += b;
        c -= Baht::from(90);
        assert_eq!(c.value(), 1600);
        let total: Baht = [a, b, Baht::from(10)].into_iter().sum();
        assert_eq!(total, Baht::from(1700));
    }

    #[test]
    fn display_and_satang() {
        assert_eq!(Baht::from(1690).to_string(), "฿1690");
        assert_eq!(Baht::from(1690).to_satang(), 169_000);
        assert!(Baht::from(-1).is_negative());
        assert!(!Baht::zero().is_negative());
    }

    #[test]
    fn serializes_as_plain_number() {
        let s = serde_json::to_string(&Baht::from(500)).unwrap();
        assert_eq!(s, "500");
        let b: Baht = serde_json::from_str("1290").unwrap();
        assert_eq!(b, Baht::from(1290));
    }

    #[test]
    fn conversion_from_u64() {
        assert_eq!(Baht::try_from(12u64).unwrap(), Baht::from(12));
        assert!(Baht::try_from(u64::MAX).is_err());
    }
}
