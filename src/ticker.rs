// 14.0: ticker snapshots. one fetch per refresh pass, shared by every pairlist stage.
// 14.1: TTL cache so back-to-back refreshes do not hammer the venue.

use crate::error::ExchangeError;
use crate::types::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_TICKER_TTL: Duration = Duration::from_secs(1800);

/// Latest quote for one pair. Any field may be missing on thin markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    #[serde(default)]
    pub last: Option<Decimal>,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub base_volume: Option<Decimal>,
    #[serde(default)]
    pub quote_volume: Option<Decimal>,
}

impl Ticker {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            last: None,
            bid: None,
            ask: None,
            base_volume: None,
            quote_volume: None,
        }
    }

    pub fn with_last(mut self, last: Decimal) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_book(mut self, bid: Decimal, ask: Decimal) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    pub fn with_quote_volume(mut self, volume: Decimal) -> Self {
        self.quote_volume = Some(volume);
        self
    }

    pub fn with_base_volume(mut self, volume: Decimal) -> Self {
        self.base_volume = Some(volume);
        self
    }
}

/// All tickers from one fetch.
#[derive(Debug, Clone, Default)]
pub struct TickerSnapshot {
    tickers: HashMap<String, Ticker>,
    pub fetched_at: Option<Timestamp>,
}

impl TickerSnapshot {
    pub fn new(tickers: Vec<Ticker>, fetched_at: Timestamp) -> Self {
        Self {
            tickers: tickers.into_iter().map(|t| (t.symbol.clone(), t)).collect(),
            fetched_at: Some(fetched_at),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Ticker> {
        self.tickers.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

#[derive(Debug)]
pub struct TickerCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Arc<TickerSnapshot>)>>,
}

impl TickerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached snapshot if still fresh, otherwise `fetch` and store the result.
    /// A failed fetch leaves the previous entry untouched.
    pub fn get_or_fetch<F>(&self, fetch: F) -> Result<Arc<TickerSnapshot>, ExchangeError>
    where
        F: FnOnce() -> Result<TickerSnapshot, ExchangeError>,
    {
        let mut entry = self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((stored_at, snapshot)) = entry.as_ref() {
            if stored_at.elapsed() < self.ttl {
                debug!(age_secs = stored_at.elapsed().as_secs(), "using cached tickers");
                return Ok(Arc::clone(snapshot));
            }
        }

        let snapshot = Arc::new(fetch()?);
        *entry = Some((Instant::now(), Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl Default for TickerCache {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn snapshot() -> TickerSnapshot {
        TickerSnapshot::new(
            vec![Ticker::new("ETH/USDT").with_last(dec!(2000))],
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn fresh_entry_is_reused() {
        let cache = TickerCache::default();
        let fetches = Cell::new(0);
        for _ in 0..3 {
            let snap = cache
                .get_or_fetch(|| {
                    fetches.set(fetches.get() + 1);
                    Ok(snapshot())
                })
                .unwrap();
            assert_eq!(snap.get("ETH/USDT").and_then(|t| t.last), Some(dec!(2000)));
        }
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn expired_entry_is_refetched() {
        let cache = TickerCache::new(Duration::ZERO);
        let fetches = Cell::new(0);
        for _ in 0..2 {
            cache
                .get_or_fetch(|| {
                    fetches.set(fetches.get() + 1);
                    Ok(snapshot())
                })
                .unwrap();
        }
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn failed_fetch_keeps_nothing() {
        let cache = TickerCache::default();
        let err = cache
            .get_or_fetch(|| Err(ExchangeError::Temporary("down".into())))
            .unwrap_err();
        assert!(err.is_transient());

        let snap = cache.get_or_fetch(|| Ok(snapshot())).unwrap();
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cache = TickerCache::default();
        let fetches = Cell::new(0);
        let mut fetch = || {
            fetches.set(fetches.get() + 1);
            Ok(snapshot())
        };
        cache.get_or_fetch(&mut fetch).unwrap();
        cache.invalidate();
        cache.get_or_fetch(&mut fetch).unwrap();
        assert_eq!(fetches.get(), 2);
    }
}
