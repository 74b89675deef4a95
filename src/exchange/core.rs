// 8.1 exchange/core.rs: the adapter struct, market catalog and ticker access.

use super::settings::ExchangeSettings;
use crate::capabilities::{capabilities_for, ExchangeCapabilities};
use crate::config::BotConfig;
use crate::error::ExchangeError;
use crate::leverage::LeverageTiers;
use crate::market::{Market, MarketCatalog};
use crate::order::DryRunLedger;
use crate::precision;
use crate::retry::{RetryPolicy, Shutdown};
use crate::snapshot::Snapshot;
use crate::ticker::{TickerCache, TickerSnapshot};
use crate::types::{Collateral, Timestamp, TradingMode};
use crate::venue::{Venue, VenueError};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/** 8.1: one adapter per venue. shared by the trading loop and the pairlist */
pub struct Exchange {
    pub(super) caps: ExchangeCapabilities,
    pub(super) settings: ExchangeSettings,
    pub(super) venue: Arc<dyn Venue>,
    pub(super) shutdown: Shutdown,
    pub(super) markets: Snapshot<MarketCatalog>,
    pub(super) brackets: Snapshot<LeverageTiers>,
    pub(super) dry_run_orders: Mutex<DryRunLedger>,
    pub(super) tickers: TickerCache,
    pub(super) ohlcv_pool: rayon::ThreadPool,
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("id", &self.caps.id)
            .field("venue", &self.venue.id())
            .field("trading_mode", &self.settings.trading_mode)
            .field("collateral", &self.settings.collateral)
            .field("dry_run", &self.settings.dry_run)
            .finish()
    }
}

impl Exchange {
    /// Builds the adapter. Fails when the venue cannot trade the configured
    /// mode and collateral, or cannot hold stoploss orders when asked to.
    pub fn new(config: &BotConfig, venue: Arc<dyn Venue>, shutdown: Shutdown) -> Result<Self, ExchangeError> {
        config.validate()?;
        let settings = ExchangeSettings::from(config);
        let caps = capabilities_for(&settings.exchange_name);

        if !caps.supports(settings.trading_mode, settings.collateral) {
            let collateral = settings
                .collateral
                .map(|c| c.to_string())
                .unwrap_or_else(|| "no".to_string());
            return Err(ExchangeError::Configuration(format!(
                "{} does not support {} collateral {} trading",
                caps.id, collateral, settings.trading_mode
            )));
        }

        if config.order_types.stoploss_on_exchange && !caps.stoploss_on_exchange {
            return Err(ExchangeError::Configuration(format!(
                "On exchange stoploss is not supported for {}",
                caps.id
            )));
        }

        let ledger = match &settings.dry_run_orders_file {
            Some(path) if settings.dry_run => DryRunLedger::with_file(path)?,
            _ => DryRunLedger::new(),
        };

        let ohlcv_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.ohlcv_workers)
            .thread_name(|i| format!("ohlcv-{}", i))
            .build()
            .map_err(|e| ExchangeError::Operational(format!("Could not start OHLCV workers: {}", e)))?;

        info!(
            exchange = %caps.id,
            trading_mode = %settings.trading_mode,
            dry_run = settings.dry_run,
            "exchange adapter ready"
        );

        Ok(Self {
            tickers: TickerCache::new(settings.ticker_ttl),
            caps,
            settings,
            venue,
            shutdown,
            markets: Snapshot::default(),
            brackets: Snapshot::default(),
            dry_run_orders: Mutex::new(ledger),
            ohlcv_pool,
        })
    }

    pub fn id(&self) -> &str {
        &self.caps.id
    }

    pub fn capabilities(&self) -> &ExchangeCapabilities {
        &self.caps
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    pub fn trading_mode(&self) -> TradingMode {
        self.settings.trading_mode
    }

    pub fn collateral(&self) -> Option<Collateral> {
        self.settings.collateral
    }

    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub fn shutdown_signal(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Runs a venue call under the configured retry policy.
    pub(super) fn call<T, F>(&self, operation: &str, mut call: F) -> Result<T, ExchangeError>
    where
        F: FnMut(&dyn Venue) -> Result<T, VenueError>,
    {
        self.call_with(self.settings.retry, operation, |venue| call(venue).map_err(ExchangeError::from))
    }

    /// Same as [`Exchange::call`] with an explicit policy and error mapping.
    pub(super) fn call_with<T, F>(&self, policy: RetryPolicy, operation: &str, mut call: F) -> Result<T, ExchangeError>
    where
        F: FnMut(&dyn Venue) -> Result<T, ExchangeError>,
    {
        let venue = self.venue.as_ref();
        policy.run(&self.shutdown, operation, || call(venue))
    }

    pub(super) fn ledger(&self) -> MutexGuard<'_, DryRunLedger> {
        self.dry_run_orders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reloads the market catalog and swaps it in. Returns the market count.
    pub fn reload_markets(&self) -> Result<usize, ExchangeError> {
        let markets = self.call("load_markets", |venue| venue.load_markets())?;
        let count = markets.len();
        self.markets.store(MarketCatalog::new(markets));
        info!(exchange = %self.caps.id, markets = count, "markets loaded");
        Ok(count)
    }

    pub fn markets(&self) -> Arc<MarketCatalog> {
        self.markets.load()
    }

    pub fn market(&self, pair: &str) -> Result<Market, ExchangeError> {
        self.markets.load().require(pair).cloned()
    }

    pub fn price_to_precision(&self, pair: &str, price: Decimal) -> Result<Decimal, ExchangeError> {
        Ok(precision::price_to_precision(&self.market(pair)?, price))
    }

    pub fn amount_to_precision(&self, pair: &str, amount: Decimal) -> Result<Decimal, ExchangeError> {
        Ok(precision::amount_to_precision(&self.market(pair)?, amount))
    }

    pub fn price_get_one_pip(&self, pair: &str, price: Decimal) -> Result<Decimal, ExchangeError> {
        Ok(precision::price_get_one_pip(&self.market(pair)?, price))
    }

    pub fn order_book_depth(&self, limit: u32) -> u32 {
        self.caps.order_book_depth(limit)
    }

    /// Shared ticker snapshot, refetched once the TTL runs out.
    pub fn fetch_tickers(&self) -> Result<Arc<TickerSnapshot>, ExchangeError> {
        self.tickers.get_or_fetch(|| {
            let tickers = self.call("fetch_tickers", |venue| venue.fetch_tickers())?;
            debug!(exchange = %self.caps.id, tickers = tickers.len(), "tickers fetched");
            Ok(TickerSnapshot::new(tickers, Timestamp::now()))
        })
    }

    pub fn invalidate_tickers(&self) {
        self.tickers.invalidate();
    }
}
