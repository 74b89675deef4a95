//! Pairlist pipeline.
//!
//! The tradable universe is produced by a chain of stages built from the
//! `pairlists` configuration. The first stage generates candidates, later
//! stages only narrow them. Order matters: ranking by volume before a price
//! filter gives a different list than the reverse.
//!
//! All stages of one refresh share a single ticker snapshot, fetched only
//! when at least one stage asks for it.

mod age;
mod manager;
mod price;
mod spread;
mod static_list;
mod volume;

pub use age::AgeFilter;
pub use manager::PairlistManager;
pub use price::PriceFilter;
pub use spread::SpreadFilter;
pub use static_list::StaticPairList;
pub use volume::VolumePairList;

use crate::config::{BotConfig, PairlistConfig};
use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::ticker::{Ticker, TickerSnapshot};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::info;

/// One stage of the chain.
pub trait PairlistFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the stage reads the shared ticker snapshot.
    fn needs_tickers(&self) -> bool;

    /// One-line description for startup messages.
    fn short_desc(&self) -> String;

    /// Returns the surviving pairs, preserving their relative order unless
    /// the stage ranks them.
    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError>;
}

/// What a stage can see during one refresh.
pub struct FilterContext<'a> {
    pub exchange: &'a Exchange,
    /// None when no stage of the chain needs tickers.
    pub tickers: Option<&'a TickerSnapshot>,
    pub log: &'a LogOnce,
}

impl<'a> FilterContext<'a> {
    pub fn ticker(&self, pair: &str) -> Option<&'a Ticker> {
        self.tickers.and_then(|t| t.get(pair))
    }
}

/// Suppresses repeated log lines within one refresh cycle.
#[derive(Debug, Default)]
pub struct LogOnce {
    seen: Mutex<HashSet<String>>,
}

impl LogOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `message` at info level unless it was already logged this cycle.
    /// Returns true when the message was emitted.
    pub fn info(&self, message: String) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if seen.contains(&message) {
            return false;
        }
        info!("{}", message);
        seen.insert(message);
        true
    }

    /// Starts a new cycle.
    pub fn reset(&self) {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }
}

/// Builds the stage for one configuration entry.
pub fn build_filter(stage: &PairlistConfig, config: &BotConfig) -> Box<dyn PairlistFilter> {
    match stage {
        PairlistConfig::StaticPairList => Box::new(StaticPairList::new(config.exchange.pair_whitelist.clone())),
        PairlistConfig::VolumePairList {
            number_assets,
            sort_key,
        } => Box::new(VolumePairList::new(*number_assets, *sort_key)),
        PairlistConfig::PriceFilter {
            low_price_ratio,
            min_price,
            max_price,
        } => Box::new(PriceFilter::new(*low_price_ratio, *min_price, *max_price)),
        PairlistConfig::SpreadFilter { max_spread_ratio } => Box::new(SpreadFilter::new(*max_spread_ratio)),
        PairlistConfig::AgeFilter { min_days_listed } => Box::new(AgeFilter::new(*min_days_listed)),
    }
}
