//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::{Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Money;

/// Percentage in the `[0, 100]` range.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(try_from = "Decimal", into = "Decimal")
)]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] by checking the provided value is within
    /// the `[0, 100]` range.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&val)
            .then_some(Self(val))
    }

    /// Creates a new whole [`Percent`], saturating at `100`.
    #[must_use]
    pub fn whole(val: u8) -> Self {
        Self(Decimal::from(val.min(100)))
    }

    /// Calculates this [`Percent`] of the provided [`Money`], rounding the
    /// result half-up to a whole minor unit.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn of(self, money: Money) -> Money {
        let share = money.to_decimal() * self.0 / Decimal::ONE_HUNDRED;
        // Never exceeds `money`, so always fits.
        Money::round(share).unwrap_or_else(|| {
            panic!("{self}% of {money} overflows `Money`")
        })
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = &'static str;

    fn try_from(val: Decimal) -> Result<Self, Self::Error> {
        Self::new(val).ok_or("percent must be within `[0, 100]` range")
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Percentage in the `[0, 100]` range.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Percent = super::Percent;

    impl Percent {
        fn to_output<S: ScalarValue>(p: &Percent) -> Value<S> {
            Value::scalar(p.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Percent` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Percent` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::Money;

    use super::Percent;

    #[test]
    fn validates_range() {
        assert!(Percent::from_str("0").is_ok());
        assert!(Percent::from_str("15").is_ok());
        assert!(Percent::from_str("100").is_ok());
        assert!(Percent::from_str("100.01").is_err());
        assert!(Percent::from_str("-1").is_err());

        assert_eq!(Percent::whole(15), Percent::from_str("15").unwrap());
        assert_eq!(Percent::whole(200), Percent::from_str("100").unwrap());
    }

    #[test]
    fn takes_share_of_money() {
        let eight = Percent::from_str("8").unwrap();
        let fifteen = Percent::from_str("15").unwrap();

        assert_eq!(
            eight.of(Money::from_minor(720_000)),
            Money::from_minor(57_600),
        );
        assert_eq!(
            fifteen.of(Money::from_minor(727_500)),
            Money::from_minor(109_125),
        );
    }

    #[test]
    fn rounds_share_half_up() {
        let ten = Percent::from_str("10").unwrap();

        assert_eq!(ten.of(Money::from_minor(5)), Money::from_minor(1));
        assert_eq!(ten.of(Money::from_minor(4)), Money::from_minor(0));
        assert_eq!(ten.of(Money::from_minor(15)), Money::from_minor(2));
    }
}
