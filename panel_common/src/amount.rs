use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode,
    Encode,
    Sqlite,
    Type,
};
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "USD";

//--------------------------------------       Amount        ---------------------------------------------------------
/// A monetary value. Amounts are exact decimals and are stored as text, so that no precision is lost in the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct AmountConversionError(String);

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map(Self)
            .map_err(|e| AmountConversionError(format!("{s}: {e}")))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Amount {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiplies the amount by the given rate, e.g. to convert a USD price into a user's currency. Returns `None` if
    /// the result cannot be represented.
    pub fn checked_convert(&self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(Self)
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl Type<Sqlite> for Amount {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Amount {
    fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        <String as Encode<'q, Sqlite>>::encode(self.0.to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Amount {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<'r, Sqlite>>::decode(value)?;
        Ok(Self::from_str(s)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        let a = Amount::from_str(" 10.50 ").unwrap();
        assert_eq!(a.to_string(), "10.5");
        assert_eq!(Amount::from_str("1e-3").unwrap(), Amount::from_str("0.001").unwrap());
        assert!(Amount::from_str("ten dollars").is_err());
    }

    #[test]
    fn arithmetic() {
        let mut a = Amount::from(5);
        a += Amount::from(10);
        assert_eq!(a, Amount::from(15));
        a -= Amount::from_str("2.5").unwrap();
        assert_eq!(a.to_string(), "12.5");
        assert!((-a).is_negative());
        assert!(!Amount::zero().is_negative());
        let total: Amount = vec![Amount::from(1), Amount::from(2)].into_iter().sum();
        assert_eq!(total, Amount::from(3));
    }

    #[test]
    fn checked_arithmetic_refuses_to_overflow() {
        let max = Amount::from(Decimal::MAX);
        assert_eq!(max.checked_add(Amount::from(1)), None);
        assert_eq!((-max).checked_sub(Amount::from(1)), None);
        assert_eq!(max.checked_convert(Decimal::from(2)), None);
        assert_eq!(Amount::from(10).checked_convert(Decimal::from_str("0.9").unwrap()), Some(Amount::from(9)));
        assert_eq!(Amount::from(10).checked_sub(Amount::from(4)), Some(Amount::from(6)));
    }

    #[test]
    fn serializes_as_string() {
        let a = Amount::from_str("0.2782").unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"0.2782\"");
    }
}
