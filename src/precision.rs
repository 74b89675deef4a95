//! Precision and rounding.
//!
//! Venues report precision either as a tick/lot size ("0.05") or as a number of
//! decimal places ("2"). Both collapse into a step size here. Prices round half
//! away from zero to the nearest step; amounts truncate toward zero so an order
//! never exceeds what was requested. A positive input never rounds to zero: it
//! is floored at one step instead.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::market::Market;

/// Precision as reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Precision {
    /// Increments must be multiples of this size.
    TickSize(Decimal),
    /// Number of decimal places allowed.
    DecimalPlaces(u32),
}

impl Precision {
    /// Smallest representable increment.
    pub fn step(&self) -> Decimal {
        match *self {
            Precision::TickSize(tick) => tick,
            Precision::DecimalPlaces(places) => Decimal::new(1, places.min(28)),
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            Precision::TickSize(tick) => tick > Decimal::ZERO,
            Precision::DecimalPlaces(places) => places <= 28,
        }
    }
}

/// Rounds `value` onto the grid defined by `precision`.
pub fn round_to_precision(value: Decimal, precision: Precision, strategy: RoundingStrategy) -> Decimal {
    let step = precision.step();
    if step <= Decimal::ZERO {
        return value;
    }

    let rounded = match precision {
        Precision::DecimalPlaces(places) => value.round_dp_with_strategy(places.min(28), strategy),
        Precision::TickSize(tick) => {
            // off the Decimal range the value is returned as is
            let rounded = value
                .checked_div(tick)
                .and_then(|steps| steps.round_dp_with_strategy(0, strategy).checked_mul(tick));
            match rounded {
                Some(rounded) => rounded,
                None => return value,
            }
        }
    };

    // never hand back zero for a positive input
    if value > Decimal::ZERO && rounded <= Decimal::ZERO {
        return step.normalize();
    }
    rounded.normalize()
}

/// Price rounded to the market's tick.
pub fn price_to_precision(market: &Market, price: Decimal) -> Decimal {
    round_to_precision(price, market.price_precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount truncated to the market's lot step.
pub fn amount_to_precision(market: &Market, amount: Decimal) -> Decimal {
    round_to_precision(amount, market.amount_precision, RoundingStrategy::ToZero)
}

/// Size of one price step at this market. The price argument is kept for
/// venues whose tick depends on the price band.
pub fn price_get_one_pip(market: &Market, _price: Decimal) -> Decimal {
    market.price_precision.step()
}
