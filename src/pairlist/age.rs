//! Listing age filter.
//!
//! Newly listed pairs are excluded until they have traded for
//! `min_days_listed` days. The listing date from market metadata is used when
//! the venue reports one, otherwise the daily candle history is counted.
//! Pairs that passed once are remembered and not checked again.

use super::{FilterContext, PairlistFilter};
use crate::error::ExchangeError;
use crate::types::Timestamp;
use std::collections::HashSet;
use std::sync::Mutex;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug)]
pub struct AgeFilter {
    min_days_listed: u32,
    checked: Mutex<HashSet<String>>,
}

impl AgeFilter {
    pub fn new(min_days_listed: u32) -> Self {
        Self {
            min_days_listed,
            checked: Mutex::new(HashSet::new()),
        }
    }

    fn remember(&self, pair: &str) {
        self.checked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(pair.to_string());
    }

    fn is_checked(&self, pair: &str) -> bool {
        self.checked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(pair)
    }

    fn removed(&self, pair: &str, ctx: &FilterContext<'_>) {
        ctx.log.info(format!(
            "Removed {} from whitelist, because age is less than {} day{}",
            pair,
            self.min_days_listed,
            if self.min_days_listed == 1 { "" } else { "s" }
        ));
    }
}

impl PairlistFilter for AgeFilter {
    fn name(&self) -> &'static str {
        "AgeFilter"
    }

    fn needs_tickers(&self) -> bool {
        false
    }

    fn short_desc(&self) -> String {
        format!(
            "{} - Filtering pairs with age less than {} day{}.",
            self.name(),
            self.min_days_listed,
            if self.min_days_listed == 1 { "" } else { "s" }
        )
    }

    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError> {
        if self.min_days_listed == 0 {
            return Ok(pairs);
        }
        let cutoff = Timestamp(Timestamp::now().as_millis() - i64::from(self.min_days_listed) * DAY_MS);
        let markets = ctx.exchange.markets();

        let mut to_fetch = Vec::new();
        for pair in &pairs {
            if self.is_checked(pair) {
                continue;
            }
            match markets.get(pair).and_then(|m| m.listed_at) {
                Some(listed_at) if listed_at <= cutoff => self.remember(pair),
                Some(_) => self.removed(pair, ctx),
                None => to_fetch.push(pair.clone()),
            }
        }

        if !to_fetch.is_empty() {
            // one extra day so a pair listed exactly at the cutoff counts
            let since = Timestamp(cutoff.as_millis() - DAY_MS);
            for (pair, candles) in ctx.exchange.fetch_ohlcv_many(&to_fetch, "1d", since) {
                match candles {
                    Ok(candles) if candles.len() >= self.min_days_listed as usize => self.remember(&pair),
                    Ok(_) => self.removed(&pair, ctx),
                    Err(e) => {
                        ctx.log.info(format!("Removed {} from whitelist, candle download failed: {}", pair, e));
                    }
                }
            }
        }

        Ok(pairs.into_iter().filter(|pair| self.is_checked(pair)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use crate::pairlist::testing::{exchange, pairs};
    use crate::pairlist::LogOnce;
    use crate::scripted::{ops, ScriptedVenue};
    use crate::venue::{Candle, VenueError};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn daily(days: i64) -> Vec<Candle> {
        let today = Timestamp::now().as_millis() / DAY_MS * DAY_MS;
        (0..days)
            .rev()
            .map(|i| Candle {
                timestamp: Timestamp(today - i * DAY_MS),
                open: dec!(1),
                high: dec!(1),
                low: dec!(1),
                close: dec!(1),
                volume: dec!(1),
            })
            .collect()
    }

    #[test]
    fn counts_daily_candles_and_caches_passing_pairs() {
        let venue = Arc::new(ScriptedVenue::new("binance"));
        venue.set_candles("OLD/USDT", daily(30));
        venue.set_candles("NEW/USDT", daily(3));
        let exchange = exchange(venue.clone());
        let log = LogOnce::new();
        let ctx = FilterContext {
            exchange: &exchange,
            tickers: None,
            log: &log,
        };

        let filter = AgeFilter::new(10);
        let result = filter.filter_pairlist(pairs(&["NEW/USDT", "OLD/USDT"]), &ctx).unwrap();
        assert_eq!(result, pairs(&["OLD/USDT"]));
        let first_round = venue.calls(ops::FETCH_OHLCV);

        // OLD is cached, only NEW is downloaded again
        let result = filter.filter_pairlist(pairs(&["NEW/USDT", "OLD/USDT"]), &ctx).unwrap();
        assert_eq!(result, pairs(&["OLD/USDT"]));
        assert_eq!(venue.calls(ops::FETCH_OHLCV), first_round + 1);
    }

    #[test]
    fn listing_date_skips_download() {
        let mut old = Market::spot("OLD/USDT", 2, 2);
        old.listed_at = Some(Timestamp(0));
        let mut fresh = Market::spot("FRESH/USDT", 2, 2);
        fresh.listed_at = Some(Timestamp::now());
        let venue = Arc::new(ScriptedVenue::new("binance").with_markets(vec![old, fresh]));
        let exchange = exchange(venue.clone());
        let log = LogOnce::new();
        let ctx = FilterContext {
            exchange: &exchange,
            tickers: None,
            log: &log,
        };

        let result = AgeFilter::new(5)
            .filter_pairlist(pairs(&["FRESH/USDT", "OLD/USDT"]), &ctx)
            .unwrap();
        assert_eq!(result, pairs(&["OLD/USDT"]));
        assert_eq!(venue.calls(ops::FETCH_OHLCV), 0);
    }

    #[test]
    fn download_failure_drops_pair() {
        let venue = Arc::new(ScriptedVenue::new("binance"));
        venue.set_candles("A/USDT", daily(30));
        venue.fail_next(ops::FETCH_OHLCV, VenueError::Other("boom".into()));
        let exchange = exchange(venue);
        let log = LogOnce::new();
        let ctx = FilterContext {
            exchange: &exchange,
            tickers: None,
            log: &log,
        };

        let filter = AgeFilter::new(10);
        assert!(filter.filter_pairlist(pairs(&["A/USDT"]), &ctx).unwrap().is_empty());
        assert_eq!(filter.filter_pairlist(pairs(&["A/USDT"]), &ctx).unwrap(), pairs(&["A/USDT"]));
    }

    #[test]
    fn desc_pluralizes() {
        assert_eq!(AgeFilter::new(1).short_desc(), "AgeFilter - Filtering pairs with age less than 1 day.");
        assert_eq!(AgeFilter::new(7).short_desc(), "AgeFilter - Filtering pairs with age less than 7 days.");
    }
}
