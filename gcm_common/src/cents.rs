use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const USD_CURRENCY_CODE: &str = "USD";

//--------------------------------------        Cents         ---------------------------------------------------------
/// A US dollar amount, held as a whole number of cents so that sums are exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<Decimal> for Cents {
    type Error = CentsConversionError;

    /// Converts a dollar amount (e.g. `25.00`) into cents. Fractions of a cent are rejected rather than rounded.
    fn try_from(dollars: Decimal) -> Result<Self, Self::Error> {
        let cents = dollars
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| CentsConversionError(format!("{dollars} is too large")))?;
        if cents.fract() != Decimal::ZERO {
            return Err(CentsConversionError(format!("{dollars} has fractional cents")));
        }
        i64::try_from(cents).map(Self).map_err(|e| CentsConversionError(format!("{dollars}: {e}")))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub fn to_dollars_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// The whole-dollar part of the amount. Use [`Cents::is_whole_dollars`] first if the remainder matters.
    pub fn whole_dollars(&self) -> i64 {
        self.0 / 100
    }

    pub fn is_whole_dollars(&self) -> bool {
        self.0 % 100 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}
