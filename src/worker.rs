// 18.x worker.rs: the trading loop driver. single writer for markets, brackets
// and the whitelist; everything else only reads the published snapshots.

use crate::config::BotConfig;
use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::pairlist::PairlistManager;
use crate::retry::Shutdown;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Refreshed(usize),
    Failed,
}

#[derive(Debug)]
pub struct Worker {
    exchange: Arc<Exchange>,
    pairlists: PairlistManager,
    shutdown: Shutdown,
    interval: Duration,
}

impl Worker {
    pub fn new(config: &BotConfig, exchange: Arc<Exchange>) -> Result<Self, ExchangeError> {
        let pairlists = PairlistManager::from_config(config, exchange.clone())?;
        Ok(Self {
            shutdown: exchange.shutdown_signal().clone(),
            exchange,
            pairlists,
            interval: Duration::from_secs(config.refresh_interval_secs),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn exchange(&self) -> &Arc<Exchange> {
        &self.exchange
    }

    pub fn pairlists(&self) -> &PairlistManager {
        &self.pairlists
    }

    /// Loads markets and, for futures, the leverage brackets. Errors here are
    /// returned to the caller; the bot cannot run without either.
    pub fn startup(&self) -> Result<(), ExchangeError> {
        let markets = self.exchange.reload_markets()?;
        let brackets = self.exchange.fill_leverage_brackets()?;
        info!(
            exchange = %self.exchange.id(),
            markets,
            brackets,
            "startup complete"
        );
        Ok(())
    }

    /// One iteration: refresh the whitelist. Failures are logged, never
    /// propagated; the previous whitelist stays published.
    pub fn process(&self) -> Tick {
        match self.pairlists.refresh_whitelist() {
            Ok(whitelist) => Tick::Refreshed(whitelist.len()),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "whitelist refresh failed");
                Tick::Failed
            }
            Err(e) => {
                warn!(error = %e, "whitelist refresh failed, retrying next cycle");
                Tick::Failed
            }
        }
    }

    /// Runs until shutdown. Returns the number of completed iterations.
    pub fn run(&self) -> Result<u64, ExchangeError> {
        self.startup()?;
        let mut iterations = 0u64;

        while !self.shutdown.is_triggered() {
            self.process();
            iterations += 1;
            if !self.shutdown.sleep(self.interval) {
                break;
            }
        }

        info!(iterations, "worker stopped");
        Ok(iterations)
    }
}
