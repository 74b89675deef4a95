// 17.0: the stage chain and the published whitelist. one refresh builds a new
// list off to the side and swaps it in; readers never see a partial list.

use super::{build_filter, FilterContext, LogOnce, PairlistFilter};
use crate::config::BotConfig;
use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::snapshot::Snapshot;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PairlistManager {
    exchange: Arc<Exchange>,
    stake_currency: String,
    blacklist: HashSet<String>,
    stages: Vec<Box<dyn PairlistFilter>>,
    whitelist: Snapshot<Vec<String>>,
    log: LogOnce,
}

impl fmt::Debug for PairlistManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairlistManager")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("whitelist", &self.whitelist.load().len())
            .finish()
    }
}

impl PairlistManager {
    pub fn from_config(config: &BotConfig, exchange: Arc<Exchange>) -> Result<Self, ExchangeError> {
        config.validate()?;
        let stages: Vec<Box<dyn PairlistFilter>> = config
            .pairlists
            .iter()
            .map(|stage| build_filter(stage, config))
            .collect();

        for stage in &stages {
            info!("{}", stage.short_desc());
        }

        Ok(Self {
            exchange,
            stake_currency: config.stake_currency.clone(),
            blacklist: config.exchange.pair_blacklist.iter().cloned().collect(),
            stages,
            whitelist: Snapshot::default(),
            log: LogOnce::new(),
        })
    }

    pub fn short_descriptions(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.short_desc()).collect()
    }

    pub fn needs_tickers(&self) -> bool {
        self.stages.iter().any(|s| s.needs_tickers())
    }

    /// Latest published whitelist.
    pub fn current_whitelist(&self) -> Arc<Vec<String>> {
        self.whitelist.load()
    }

    /// Handle for readers on other threads.
    pub fn whitelist_handle(&self) -> Snapshot<Vec<String>> {
        self.whitelist.clone()
    }

    /// Recomputes and publishes the whitelist. On error the previous list
    /// stays in place.
    pub fn refresh_whitelist(&self) -> Result<Arc<Vec<String>>, ExchangeError> {
        self.log.reset();
        self.exchange.reload_markets()?;

        let mode = self.exchange.trading_mode();
        let candidates: Vec<String> = self
            .exchange
            .markets()
            .active_symbols(&self.stake_currency, mode)
            .into_iter()
            .filter(|pair| {
                let blacklisted = self.blacklist.contains(pair);
                if blacklisted {
                    debug!(pair = %pair, "blacklisted");
                }
                !blacklisted
            })
            .collect();

        let tickers = if self.needs_tickers() {
            Some(self.exchange.fetch_tickers()?)
        } else {
            None
        };
        let ctx = FilterContext {
            exchange: &self.exchange,
            tickers: tickers.as_deref(),
            log: &self.log,
        };

        let mut pairs = candidates;
        for stage in &self.stages {
            pairs = stage.filter_pairlist(pairs, &ctx)?;
            debug!(stage = stage.name(), pairs = pairs.len(), "pairlist stage applied");
        }

        info!(pairs = pairs.len(), "whitelist refreshed: {}", pairs.join(", "));
        self.whitelist.store(pairs);
        Ok(self.whitelist.load())
    }
}
