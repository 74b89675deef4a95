// 8.3 exchange/ohlcv.rs: paged candle history. one pair is paged sequentially,
// several pairs fan out over the bounded OHLCV worker pool.

use super::core::Exchange;
use crate::error::ExchangeError;
use crate::types::{timeframe_to_millis, Timestamp};
use crate::venue::Candle;
use rayon::prelude::*;
use tracing::{debug, warn};

impl Exchange {
    /// Downloads candles for `pair` from `since` up to `until` (or the latest
    /// candle), one venue page at a time. Stops early on a short page or when
    /// shutdown is requested and returns what was collected.
    pub fn fetch_historic_ohlcv(
        &self,
        pair: &str,
        timeframe: &str,
        since: Timestamp,
        until: Option<Timestamp>,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let step = timeframe_to_millis(timeframe)
            .ok_or_else(|| ExchangeError::Configuration(format!("Invalid timeframe {}", timeframe)))?;
        let limit = self.caps.ohlcv_candle_limit;

        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = since;

        loop {
            if self.shutdown.is_triggered() {
                debug!(pair, candles = candles.len(), "shutdown during candle download");
                break;
            }

            let page = match self.call("fetch_ohlcv", |venue| {
                venue.fetch_ohlcv(pair, timeframe, Some(cursor), limit)
            }) {
                Ok(page) => page,
                Err(ExchangeError::Shutdown) => break,
                Err(e) => return Err(e),
            };
            let page_len = page.len();

            let before = candles.len();
            for candle in page {
                if until.is_some_and(|end| candle.timestamp > end) {
                    break;
                }
                let in_order = candles.last().map_or(true, |last| candle.timestamp > last.timestamp);
                if in_order {
                    candles.push(candle);
                }
            }

            let Some(last) = candles.last() else { break };
            if candles.len() == before || page_len < limit {
                break;
            }
            if until.is_some_and(|end| last.timestamp >= end) {
                break;
            }
            cursor = Timestamp(last.timestamp.as_millis() + step);
        }

        debug!(pair, timeframe, candles = candles.len(), "candle history downloaded");
        Ok(candles)
    }

    /// Candle history for several pairs on the worker pool. Results keep the
    /// order of `pairs`; a failing pair does not affect the others.
    pub fn fetch_ohlcv_many(
        &self,
        pairs: &[String],
        timeframe: &str,
        since: Timestamp,
    ) -> Vec<(String, Result<Vec<Candle>, ExchangeError>)> {
        self.ohlcv_pool.install(|| {
            pairs
                .par_iter()
                .map(|pair| {
                    let result = self.fetch_historic_ohlcv(pair, timeframe, since, None);
                    if let Err(e) = &result {
                        warn!(pair = %pair, error = %e, "could not download candles");
                    }
                    (pair.clone(), result)
                })
                .collect()
        })
    }
}
