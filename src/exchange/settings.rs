// 8.0.1: the slice of BotConfig the adapter needs, resolved once at startup.

use crate::config::BotConfig;
use crate::retry::RetryPolicy;
use crate::types::{Collateral, TradingMode};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub exchange_name: String,
    pub dry_run: bool,
    pub trading_mode: TradingMode,
    pub collateral: Option<Collateral>,
    pub stoploss_limit_ratio: Decimal,
    pub leverage_brackets_file: Option<PathBuf>,
    pub dry_run_orders_file: Option<PathBuf>,
    pub ohlcv_workers: usize,
    pub retry: RetryPolicy,
    pub ticker_ttl: Duration,
}

impl From<&BotConfig> for ExchangeSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            exchange_name: config.exchange.name.clone(),
            dry_run: config.dry_run,
            trading_mode: config.trading_mode,
            collateral: config.collateral,
            stoploss_limit_ratio: config.order_types.stoploss_on_exchange_limit_ratio,
            leverage_brackets_file: config.exchange.leverage_brackets_file.clone(),
            dry_run_orders_file: config.exchange.dry_run_orders_file.clone(),
            ohlcv_workers: config.exchange.ohlcv_workers.max(1),
            retry: RetryPolicy::from(&config.retry),
            ticker_ttl: Duration::from_secs(config.ticker_ttl_secs),
        }
    }
}
