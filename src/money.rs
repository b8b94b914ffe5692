use std::{
    fmt,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use sqlx::{
    encode::IsNull, error::BoxDynError, sqlite::SqliteTypeInfo, Database, Decode, Encode, Sqlite,
    Type,
};

/// Largest amount a form may carry: ten digits, two of them decimals.
const MAX_CENTS: i64 = 9_999_999_999;

/// An amount of money with two decimals, stored as INTEGER cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Montant requis")]
    Empty,
    #[error("Montant invalide")]
    Invalid,
    #[error("Le montant ne peut pas être négatif")]
    Negative,
    #[error("Deux décimales maximum")]
    TooManyDecimals,
    #[error("Montant trop élevé")]
    Overflow,
}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn max() -> Self {
        Money::from_cents(MAX_CENTS)
    }

    pub fn cents(self) -> Option<i64> {
        self.0.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
    }

    /// Parses a non-negative amount such as `1234`, `1234.5` or `1234,50`,
    /// up to `99999999.99`.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MoneyError::Empty);
        }
        if input.starts_with('-') {
            return Err(MoneyError::Negative);
        }
        let input = input.strip_prefix('+').unwrap_or(input);

        let (units, fraction) = match input.find(['.', ',']) {
            Some(pos) => (&input[..pos], &input[pos + 1..]),
            None => (input, ""),
        };
        if units.is_empty() && fraction.is_empty() {
            return Err(MoneyError::Invalid);
        }
        if !units.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyError::Invalid);
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooManyDecimals);
        }

        let units = if units.is_empty() { "0" } else { units };
        let fraction = if fraction.is_empty() { "0" } else { fraction };
        // Digits only at this point, so a failure means the value is too large.
        let mut amount = Decimal::from_str(&format!("{}.{}", units, fraction))
            .map_err(|_| MoneyError::Overflow)?;
        if amount > Money::max().0 {
            return Err(MoneyError::Overflow);
        }
        amount.rescale(2);
        Ok(Money(amount))
    }

    /// `percent`% of this amount, rounded half away from zero to the cent.
    pub fn percent(self, percent: i64) -> Money {
        let scaled = self.0.saturating_mul(Decimal::from(percent)) / Decimal::ONE_HUNDRED;
        Money(scaled.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Type<Sqlite> for Money {
    fn type_info() -> SqliteTypeInfo {
        <i64 as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        let cents = self
            .cents()
            .ok_or_else(|| format!("amount {} does not fit in INTEGER cents", self))?;
        <i64 as Encode<'q, Sqlite>>::encode_by_ref(&cents, buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Money {
    fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        Ok(Money::from_cents(<i64 as Decode<'r, Sqlite>>::decode(value)?))
    }
}

// Saturating, so report totals cannot panic.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
