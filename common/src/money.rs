//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use derive_more::{Add, AddAssign, Sub, Sum};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{prelude::ToPrimitive as _, Decimal, RoundingStrategy};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::define_kind;

/// Amount of money in minor units of a [`Currency`] (cents, for example).
///
/// Integer representation keeps sums exact: every price component is rounded
/// to a whole minor unit before being stored.
#[derive(
    Add,
    AddAssign,
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Sub,
    Sum,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(transparent)
)]
pub struct Money(i64);

impl Money {
    /// Zero [`Money`].
    pub const ZERO: Self = Self(0);

    /// Number of minor units in a major one.
    const SCALE: u32 = 2;

    /// Creates a new [`Money`] from the provided amount of minor units.
    #[must_use]
    pub const fn from_minor(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns the amount of minor units in this [`Money`].
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Indicates whether this [`Money`] is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Indicates whether this [`Money`] is above zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Rounds the provided amount of minor units half-up into [`Money`].
    ///
    /// [`None`] is returned if the rounded amount doesn't fit.
    #[must_use]
    pub fn round(minor: Decimal) -> Option<Self> {
        minor
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Self)
    }

    /// Returns this [`Money`] as a [`Decimal`] amount of minor units.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = Decimal::new(self.0, Self::SCALE);
        write!(f, "{major:.2}")
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let major = Decimal::from_str(s).map_err(|_| "invalid amount")?;
        if major.scale() > Self::SCALE {
            return Err("too many fractional digits");
        }
        (major * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Self)
            .ok_or("amount overflow")
    }
}

define_kind! {
    #[doc = "Currency of [`Money`] amounts."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Russian Ruble."]
        Rub = 3,
    }
}

impl Currency {
    /// Returns the lowercase [ISO 4217] code of this [`Currency`].
    ///
    /// [ISO 4217]: https://en.wikipedia.org/wiki/ISO_4217
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Rub => "rub",
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer of at most two digits.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    #[test]
    fn from_str() {
        assert_eq!(Money::from_str("123.45").unwrap(), Money::from_minor(12345));
        assert_eq!(Money::from_str("123").unwrap(), Money::from_minor(12300));
        assert_eq!(Money::from_str("0.5").unwrap(), Money::from_minor(50));

        assert!(Money::from_str("123.456").is_err());
        assert!(Money::from_str("12USD").is_err());
        assert!(Money::from_str("").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(Money::from_minor(965_100).to_string(), "9651.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-1250).to_string(), "-12.50");
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(
            Money::round(Decimal::new(5, 1)),
            Some(Money::from_minor(1)),
        );
        assert_eq!(
            Money::round(Decimal::new(1_091_250, 1)),
            Some(Money::from_minor(109_125)),
        );
        assert_eq!(
            Money::round(Decimal::new(49, 2)),
            Some(Money::from_minor(0)),
        );
    }

    #[test]
    fn sums() {
        let total = [720_000, 57_600, 7_500, 180_000]
            .into_iter()
            .map(Money::from_minor)
            .sum::<Money>();

        assert_eq!(total, Money::from_minor(965_100));
    }

    #[test]
    fn currency_codes() {
        assert_eq!(Currency::Usd.code(), "usd");
        assert_eq!(Currency::from_str("EUR").unwrap(), Currency::Eur);
    }
}
