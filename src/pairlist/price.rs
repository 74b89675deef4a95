//! Price filter.
//!
//! Drops pairs so cheap that one price step is a large fraction of the price,
//! and pairs outside a configured price band. Zero thresholds are disabled;
//! with every threshold at zero the stage passes pairs through untouched.

use super::{FilterContext, PairlistFilter};
use crate::error::ExchangeError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct PriceFilter {
    low_price_ratio: Decimal,
    min_price: Decimal,
    max_price: Decimal,
}

impl PriceFilter {
    pub fn new(low_price_ratio: Decimal, min_price: Decimal, max_price: Decimal) -> Self {
        Self {
            low_price_ratio,
            min_price,
            max_price,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.low_price_ratio > Decimal::ZERO || self.min_price > Decimal::ZERO || self.max_price > Decimal::ZERO
    }

    fn validate_pair(&self, pair: &str, ctx: &FilterContext<'_>) -> Result<bool, ExchangeError> {
        let last = match ctx.ticker(pair).and_then(|t| t.last) {
            Some(last) if !last.is_zero() => last,
            _ => {
                ctx.log.info(format!(
                    "Removed {} from whitelist, because ticker['last'] is empty (Usually no trade in the last 24h).",
                    pair
                ));
                return Ok(false);
            }
        };

        if !self.low_price_ratio.is_zero() {
            let pip = ctx.exchange.price_get_one_pip(pair, last)?;
            let change = pip / last;
            if change > self.low_price_ratio {
                ctx.log.info(format!(
                    "Removed {} from whitelist, because 1 unit is {:.3}%",
                    pair,
                    change * dec!(100)
                ));
                return Ok(false);
            }
        }

        if !self.min_price.is_zero() && last < self.min_price {
            ctx.log.info(format!(
                "Removed {} from whitelist, because last price < {:.8}",
                pair, self.min_price
            ));
            return Ok(false);
        }

        if !self.max_price.is_zero() && last > self.max_price {
            ctx.log.info(format!(
                "Removed {} from whitelist, because last price > {:.8}",
                pair, self.max_price
            ));
            return Ok(false);
        }

        Ok(true)
    }
}

impl PairlistFilter for PriceFilter {
    fn name(&self) -> &'static str {
        "PriceFilter"
    }

    fn needs_tickers(&self) -> bool {
        true
    }

    fn short_desc(&self) -> String {
        let mut active = Vec::new();
        if !self.low_price_ratio.is_zero() {
            active.push(format!("below {}%", (self.low_price_ratio * dec!(100)).normalize()));
        }
        if !self.min_price.is_zero() {
            active.push(format!("below {:.8}", self.min_price));
        }
        if !self.max_price.is_zero() {
            active.push(format!("above {:.8}", self.max_price));
        }
        if active.is_empty() {
            return format!("{} - No price filters configured.", self.name());
        }
        format!("{} - Filtering pairs priced {}.", self.name(), active.join(" or "))
    }

    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError> {
        if !self.is_enabled() {
            return Ok(pairs);
        }
        let mut kept = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if self.validate_pair(&pair, ctx)? {
                kept.push(pair);
            }
        }
        Ok(kept)
    }
}
