use std::{
    borrow::Cow,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
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

pub const CURRENCY_CODE: &str = "INR";
pub const MINOR_UNITS_PER_RUPEE: i64 = 100;

//--------------------------------------        Money        ---------------------------------------------------------
/// An exact-decimal Rupee amount.
///
/// All monetary arithmetic in the system goes through this type. The inner representation is a
/// [`rust_decimal::Decimal`], so sums and products of catalogue prices are exact and independent of any binary
/// floating point representation. Rounding only ever happens through [`Money::round_half_up`], which callers invoke
/// at the single point where a derived amount (tax) is computed.
///
/// Amounts are stored in SQLite as their canonical decimal string, hence the hand-rolled codec implementations below
/// (`Decimal` has no native SQLite mapping).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Builds an amount from a whole number of paise, e.g. `from_paise(29_990)` is ₹299.90.
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::new(paise, 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rounds to two decimal places, away from zero on the midpoint. This is the only rounding mode used anywhere
    /// in the pricing pipeline.
    pub fn round_half_up(&self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Converts the amount into the gateway's minor-unit integer representation (paise).
    ///
    /// The conversion is exact-or-reject: an amount carrying sub-paise precision is an error rather than being
    /// silently truncated.
    pub fn to_minor_units(&self) -> Result<i64, MoneyConversionError> {
        let paise = self.0 * Decimal::from(MINOR_UNITS_PER_RUPEE);
        if !paise.fract().is_zero() {
            return Err(MoneyConversionError(format!("{} has sub-paise precision", self.0)));
        }
        paise.to_i64().ok_or_else(|| MoneyConversionError(format!("{} is out of range", self.0)))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| MoneyConversionError(format!("{s} is not a valid amount: {e}")))?;
        Ok(Self(value))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

//----------------------------------------   SQLite codecs   ---------------------------------------------------------

impl Type<Sqlite> for Money {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Money {
    fn encode_by_ref(&self, args: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        args.push(SqliteArgumentValue::Text(Cow::Owned(self.0.to_string())));
        IsNull::No
    }
}

impl<'r> Decode<'r, Sqlite> for Money {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
        let value = Decimal::from_str(text)?;
        Ok(Self(value))
    }
}
