use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::db::spot::Category;

/// The first 30 minutes of any stay are free.
pub const GRACE_PERIOD: Duration = Duration::minutes(30);

/// Multiplier applied to the fare of a returning vehicle.
const LOYALTY_DISCOUNT: Decimal = Decimal::from_parts(95, 0, 0, false, 2);

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Hourly rates per vehicle category.
///
/// Values come from configuration; the defaults match the deployed lot.
#[derive(Clone, Debug, Deserialize)]
pub struct Rates {
    pub car_rate_per_hour: Decimal,
    pub bike_rate_per_hour: Decimal,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            car_rate_per_hour: Decimal::new(150, 2),
            bike_rate_per_hour: Decimal::new(100, 2),
        }
    }
}

impl Rates {
    fn per_hour(&self, category: Category) -> Decimal {
        match category {
            Category::Car => self.car_rate_per_hour,
            Category::Bike => self.bike_rate_per_hour,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The exit time precedes the entry time.
    InvalidInterval,
}

/// Computes the price of a stay.
///
/// The stay is billed per elapsed whole minute beyond the grace period, at
/// the category's hourly rate. The loyalty discount is applied before the
/// one and only rounding step, half-up to two decimal places.
pub fn compute(
    entry_time: OffsetDateTime,
    exit_time: OffsetDateTime,
    category: Category,
    discount: bool,
    rates: &Rates,
) -> Result<Decimal, Error> {
    if exit_time < entry_time {
        return Err(Error::InvalidInterval);
    }

    // Whole minutes, fractional seconds truncated.
    let minutes = (exit_time - entry_time).whole_minutes();
    if minutes <= GRACE_PERIOD.whole_minutes() {
        return Ok(Decimal::ZERO);
    }

    let chargeable = minutes - GRACE_PERIOD.whole_minutes();
    let mut price =
        Decimal::from(chargeable) * rates.per_hour(category) / MINUTES_PER_HOUR;
    if discount {
        price *= LOYALTY_DISCOUNT;
    }

    Ok(price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
