//! [`Price`] calculation of a stay.

use common::{Money, Percent};
use derive_more::{Display, Error};
use rust_decimal::Decimal;

#[cfg(doc)]
use crate::domain::{Reservation, Unit};

/// Number of nights a monthly price covers.
const NIGHTS_PER_MONTH: i64 = 30;

/// Price snapshot of a [`Reservation`], fixed at its creation.
///
/// Every component is rounded half-up to a whole minor unit on its own, so
/// `total` is an exact sum of the stored components.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Price {
    /// Price of a single night, for information only.
    pub daily_rate: Money,

    /// Price of all the nights of the stay.
    pub subtotal: Money,

    /// Platform service fee charged to the guest.
    pub service_fee: Money,

    /// One-time cleaning fee.
    pub cleaning_fee: Money,

    /// Refundable security deposit.
    pub security_deposit: Money,

    /// Total amount the guest pays.
    pub total: Money,
}

/// Input of a [`Price`] calculation, taken from a [`Unit`].
#[derive(Clone, Copy, Debug)]
pub struct Rates {
    /// Price of a month (30 nights) of stay.
    pub monthly_price: Money,

    /// One-time cleaning fee.
    pub cleaning_fee: Money,

    /// Refundable security deposit, if any.
    pub security_deposit: Option<Money>,
}

impl Price {
    /// Calculates the [`Price`] of staying the provided number of `nights`
    /// at the provided [`Rates`].
    ///
    /// # Errors
    ///
    /// - If `nights` is zero.
    /// - If any of the [`Rates`] is negative.
    /// - If the result doesn't fit into [`Money`].
    pub fn calculate(
        rates: Rates,
        nights: u32,
        service_fee: Percent,
    ) -> Result<Self, PricingError> {
        let Rates {
            monthly_price,
            cleaning_fee,
            security_deposit,
        } = rates;
        let security_deposit = security_deposit.unwrap_or(Money::ZERO);

        if nights == 0 {
            return Err(PricingError::NoNights);
        }
        if [monthly_price, cleaning_fee, security_deposit]
            .into_iter()
            .any(Money::is_negative)
        {
            return Err(PricingError::NegativeRate);
        }

        let per_month = Decimal::from(NIGHTS_PER_MONTH);
        let daily_rate = Money::round(monthly_price.to_decimal() / per_month)
            .ok_or(PricingError::Overflow)?;
        // Multiplying before dividing keeps the intermediate value exact.
        let subtotal = Money::round(
            monthly_price.to_decimal() * Decimal::from(nights) / per_month,
        )
        .ok_or(PricingError::Overflow)?;
        let service_fee = service_fee.of(subtotal);

        let total = [subtotal, service_fee, cleaning_fee, security_deposit]
            .into_iter()
            .try_fold(0_i64, |acc, m| acc.checked_add(m.minor()))
            .map(Money::from_minor)
            .ok_or(PricingError::Overflow)?;

        Ok(Self {
            daily_rate,
            subtotal,
            service_fee,
            cleaning_fee,
            security_deposit,
            total,
        })
    }

    /// Returns the part of this [`Price`] earned by the host: the
    /// `subtotal` and the `cleaning_fee`.
    #[must_use]
    pub fn host_gross(&self) -> Money {
        self.subtotal + self.cleaning_fee
    }
}

/// Error of a [`Price`] calculation.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum PricingError {
    /// Stay has no nights.
    #[display("stay must last at least one night")]
    NoNights,

    /// Some rate is negative.
    #[display("rates must not be negative")]
    NegativeRate,

    /// Calculated amount doesn't fit into `Money`.
    #[display("price overflow")]
    Overflow,
}

#[cfg(test)]
mod spec {
    use common::{Money, Percent};

    use super::{Price, PricingError, Rates};

    fn percent(v: &str) -> Percent {
        v.parse().unwrap()
    }

    fn rates(monthly: i64, cleaning: i64, deposit: Option<i64>) -> Rates {
        Rates {
            monthly_price: Money::from_minor(monthly),
            cleaning_fee: Money::from_minor(cleaning),
            security_deposit: deposit.map(Money::from_minor),
        }
    }

    #[test]
    fn calculates_reference_stay() {
        let price = Price::calculate(
            rates(180_000, 7_500, Some(180_000)),
            120,
            percent("8"),
        )
        .unwrap();

        assert_eq!(price.daily_rate, Money::from_minor(6_000));
        assert_eq!(price.subtotal, Money::from_minor(720_000));
        assert_eq!(price.service_fee, Money::from_minor(57_600));
        assert_eq!(price.cleaning_fee, Money::from_minor(7_500));
        assert_eq!(price.security_deposit, Money::from_minor(180_000));
        assert_eq!(price.total, Money::from_minor(965_100));
        assert_eq!(price.host_gross(), Money::from_minor(727_500));
    }

    #[test]
    fn rounds_each_component_half_up() {
        // 100 * 1 / 30 = 3.33.. and 100 * 2 / 30 = 6.66..
        let one = Price::calculate(rates(100, 0, None), 1, percent("8"))
            .unwrap();
        let two = Price::calculate(rates(100, 0, None), 2, percent("8"))
            .unwrap();

        assert_eq!(one.subtotal, Money::from_minor(3));
        assert_eq!(two.subtotal, Money::from_minor(7));

        // 45 * 10 / 30 = 15, fee 15 * 10% = 1.5
        let fee = Price::calculate(rates(45, 0, None), 10, percent("10"))
            .unwrap();
        assert_eq!(fee.subtotal, Money::from_minor(15));
        assert_eq!(fee.service_fee, Money::from_minor(2));
        assert_eq!(fee.total, Money::from_minor(17));
    }

    #[test]
    fn rounds_exact_midpoints_up() {
        // 1 * 15 / 30 is exactly half a minor unit.
        let price = Price::calculate(rates(1, 0, None), 15, percent("0"))
            .unwrap();

        assert_eq!(price.subtotal, Money::from_minor(1));
    }

    #[test]
    fn is_deterministic() {
        let calc = || {
            Price::calculate(rates(123_457, 999, Some(1)), 47, percent("8"))
                .unwrap()
        };

        assert_eq!(calc(), calc());
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(
            Price::calculate(rates(100, 0, None), 0, percent("8")),
            Err(PricingError::NoNights),
        );
        assert_eq!(
            Price::calculate(rates(-100, 0, None), 1, percent("8")),
            Err(PricingError::NegativeRate),
        );
        assert_eq!(
            Price::calculate(rates(100, 0, Some(-1)), 1, percent("8")),
            Err(PricingError::NegativeRate),
        );
    }
}
