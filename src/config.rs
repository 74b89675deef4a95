// 7.0 config.rs: all settings in one place. exchange, stake, trading mode,
// order types, pairlist chain, retry budget and refresh timing.
// 7.1 PairlistConfig is tagged by "method", one variant per filter stage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ExchangeError;
use crate::order::DEFAULT_STOPLOSS_LIMIT_RATIO;
use crate::retry::RetryConfig;
use crate::types::{Collateral, TradingMode};

// Exchange connection and pair universe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    // Exchange identifier, selects the capability table
    pub name: String,
    // Pairs for StaticPairList, in priority order
    pub pair_whitelist: Vec<String>,
    // Pairs never traded
    pub pair_blacklist: Vec<String>,
    // Leverage bracket file used in dry-run instead of the bundled table
    pub leverage_brackets_file: Option<PathBuf>,
    // Persist dry-run orders here
    pub dry_run_orders_file: Option<PathBuf>,
    // Threads for concurrent candle downloads
    pub ohlcv_workers: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: "binance".to_string(),
            pair_whitelist: Vec::new(),
            pair_blacklist: Vec::new(),
            leverage_brackets_file: None,
            dry_run_orders_file: None,
            ohlcv_workers: 4,
        }
    }
}

/** 7.2: stoploss placement settings */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderTypesConfig {
    // Place the stoploss as a resting stop-limit order on the exchange
    pub stoploss_on_exchange: bool,
    // Limit price = stop * ratio for sell stops, stop * (2 - ratio) for buy stops
    pub stoploss_on_exchange_limit_ratio: Decimal,
}

impl Default for OrderTypesConfig {
    fn default() -> Self {
        Self {
            stoploss_on_exchange: false,
            stoploss_on_exchange_limit_ratio: DEFAULT_STOPLOSS_LIMIT_RATIO,
        }
    }
}

// Which ticker volume VolumePairList ranks by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSortKey {
    QuoteVolume,
    BaseVolume,
}

impl Default for VolumeSortKey {
    fn default() -> Self {
        Self::QuoteVolume
    }
}

fn default_number_assets() -> usize {
    20
}

fn default_max_spread_ratio() -> Decimal {
    dec!(0.005)
}

fn default_min_days_listed() -> u32 {
    10
}

// One stage of the pairlist chain. zero thresholds disable a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum PairlistConfig {
    StaticPairList,
    VolumePairList {
        #[serde(default = "default_number_assets")]
        number_assets: usize,
        #[serde(default)]
        sort_key: VolumeSortKey,
    },
    PriceFilter {
        #[serde(default)]
        low_price_ratio: Decimal,
        #[serde(default)]
        min_price: Decimal,
        #[serde(default)]
        max_price: Decimal,
    },
    SpreadFilter {
        #[serde(default = "default_max_spread_ratio")]
        max_spread_ratio: Decimal,
    },
    AgeFilter {
        #[serde(default = "default_min_days_listed")]
        min_days_listed: u32,
    },
}

impl PairlistConfig {
    pub fn method(&self) -> &'static str {
        match self {
            PairlistConfig::StaticPairList => "StaticPairList",
            PairlistConfig::VolumePairList { .. } => "VolumePairList",
            PairlistConfig::PriceFilter { .. } => "PriceFilter",
            PairlistConfig::SpreadFilter { .. } => "SpreadFilter",
            PairlistConfig::AgeFilter { .. } => "AgeFilter",
        }
    }

    // generators produce the initial list, filters only narrow it
    pub fn is_generator(&self) -> bool {
        matches!(self, PairlistConfig::StaticPairList | PairlistConfig::VolumePairList { .. })
    }
}

// The complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    // Simulate orders locally instead of sending them
    pub dry_run: bool,
    pub exchange: ExchangeConfig,
    // Quote currency every traded pair must settle in
    pub stake_currency: String,
    pub trading_mode: TradingMode,
    // Required for margin and futures
    pub collateral: Option<Collateral>,
    pub order_types: OrderTypesConfig,
    pub pairlists: Vec<PairlistConfig>,
    pub retry: RetryConfig,
    // Ticker snapshot lifetime
    pub ticker_ttl_secs: u64,
    // Whitelist refresh interval of the trading loop
    pub refresh_interval_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            exchange: ExchangeConfig::default(),
            stake_currency: "USDT".to_string(),
            trading_mode: TradingMode::Spot,
            collateral: None,
            order_types: OrderTypesConfig::default(),
            pairlists: vec![PairlistConfig::StaticPairList],
            retry: RetryConfig::default(),
            ticker_ttl_secs: 1800,
            refresh_interval_secs: 60,
        }
    }
}

impl BotConfig {
    // Dry-run isolated futures on binance
    pub fn futures_isolated() -> Self {
        Self {
            trading_mode: TradingMode::Futures,
            collateral: Some(Collateral::Isolated),
            order_types: OrderTypesConfig {
                stoploss_on_exchange: true,
                ..OrderTypesConfig::default()
            },
            ..Self::default()
        }
    }

    // Volume ranked universe with price and spread sanity filters
    pub fn dynamic_spot() -> Self {
        Self {
            pairlists: vec![
                PairlistConfig::VolumePairList {
                    number_assets: default_number_assets(),
                    sort_key: VolumeSortKey::QuoteVolume,
                },
                PairlistConfig::PriceFilter {
                    low_price_ratio: dec!(0.01),
                    min_price: Decimal::ZERO,
                    max_price: Decimal::ZERO,
                },
                PairlistConfig::SpreadFilter {
                    max_spread_ratio: default_max_spread_ratio(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange.name.trim().is_empty() {
            return Err(ConfigError::InvalidExchange {
                reason: "Exchange name must not be empty".to_string(),
            });
        }
        if self.stake_currency.trim().is_empty() {
            return Err(ConfigError::InvalidExchange {
                reason: "Stake currency must not be empty".to_string(),
            });
        }
        if self.exchange.ohlcv_workers == 0 {
            return Err(ConfigError::InvalidExchange {
                reason: "Need at least 1 OHLCV worker".to_string(),
            });
        }

        // ratio must leave the limit strictly beyond the trigger
        let ratio = self.order_types.stoploss_on_exchange_limit_ratio;
        if ratio <= Decimal::ZERO || ratio >= Decimal::ONE {
            return Err(ConfigError::InvalidOrderTypes {
                reason: format!("stoploss_on_exchange_limit_ratio must be between 0 and 1, got {}", ratio),
            });
        }

        if self.retry.backoff_base_ms > self.retry.backoff_max_ms {
            return Err(ConfigError::InvalidRetry {
                reason: "backoff_base_ms must not exceed backoff_max_ms".to_string(),
            });
        }

        self.validate_pairlists()
    }

    fn validate_pairlists(&self) -> Result<(), ConfigError> {
        let Some(first) = self.pairlists.first() else {
            return Err(ConfigError::InvalidPairlist {
                reason: "No pairlist configured".to_string(),
            });
        };
        if !first.is_generator() {
            return Err(ConfigError::InvalidPairlist {
                reason: format!("{} can only be used after a pair list generator", first.method()),
            });
        }

        for stage in &self.pairlists {
            match stage {
                PairlistConfig::StaticPairList => {}
                PairlistConfig::VolumePairList { number_assets, .. } => {
                    if *number_assets == 0 {
                        return Err(ConfigError::InvalidPairlist {
                            reason: "VolumePairList requires number_assets > 0".to_string(),
                        });
                    }
                }
                PairlistConfig::PriceFilter {
                    low_price_ratio,
                    min_price,
                    max_price,
                } => {
                    for (name, value) in [
                        ("low_price_ratio", low_price_ratio),
                        ("min_price", min_price),
                        ("max_price", max_price),
                    ] {
                        if *value < Decimal::ZERO {
                            return Err(ConfigError::InvalidPairlist {
                                reason: format!("PriceFilter requires {} to be >= 0", name),
                            });
                        }
                    }
                }
                PairlistConfig::SpreadFilter { max_spread_ratio } => {
                    if *max_spread_ratio < Decimal::ZERO {
                        return Err(ConfigError::InvalidPairlist {
                            reason: "SpreadFilter requires max_spread_ratio to be >= 0".to_string(),
                        });
                    }
                }
                PairlistConfig::AgeFilter { min_days_listed } => {
                    if *min_days_listed == 0 {
                        return Err(ConfigError::InvalidPairlist {
                            reason: "AgeFilter requires min_days_listed to be >= 1".to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {reason}")]
    Read { reason: String },
    #[error("cannot parse config: {reason}")]
    Parse { reason: String },
    #[error("invalid exchange settings: {reason}")]
    InvalidExchange { reason: String },
    #[error("invalid order types: {reason}")]
    InvalidOrderTypes { reason: String },
    #[error("invalid pairlist: {reason}")]
    InvalidPairlist { reason: String },
    #[error("invalid retry settings: {reason}")]
    InvalidRetry { reason: String },
}

impl From<ConfigError> for ExchangeError {
    fn from(err: ConfigError) -> Self {
        ExchangeError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = BotConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.dry_run);
        assert_eq!(config.order_types.stoploss_on_exchange_limit_ratio, dec!(0.99));
        assert_eq!(config.ticker_ttl_secs, 1800);
    }

    #[test]
    fn test_presets_valid() {
        assert!(BotConfig::futures_isolated().validate().is_ok());
        assert!(BotConfig::dynamic_spot().validate().is_ok());
    }

    #[test]
    fn test_invalid_limit_ratio() {
        let mut config = BotConfig::default();
        config.order_types.stoploss_on_exchange_limit_ratio = dec!(1.01);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOrderTypes { .. })));

        config.order_types.stoploss_on_exchange_limit_ratio = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_price_filter() {
        let mut config = BotConfig::dynamic_spot();
        config.pairlists[1] = PairlistConfig::PriceFilter {
            low_price_ratio: Decimal::ZERO,
            min_price: dec!(-1),
            max_price: Decimal::ZERO,
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(&err, ConfigError::InvalidPairlist { reason } if reason.contains("min_price")));
    }

    #[test]
    fn test_filter_cannot_lead_the_chain() {
        let mut config = BotConfig::default();
        config.pairlists = vec![PairlistConfig::SpreadFilter {
            max_spread_ratio: dec!(0.01),
        }];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPairlist { .. })));

        config.pairlists.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "dry_run": false,
            "stake_currency": "USDT",
            "trading_mode": "futures",
            "collateral": "isolated",
            "exchange": {"name": "binance", "pair_blacklist": ["BNB/USDT"]},
            "order_types": {"stoploss_on_exchange": true},
            "pairlists": [
                {"method": "VolumePairList", "number_assets": 2},
                {"method": "PriceFilter", "min_price": "0.001"},
                {"method": "AgeFilter"}
            ]
        }"#;
        let config = BotConfig::from_json_str(json).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.trading_mode, TradingMode::Futures);
        assert_eq!(config.collateral, Some(Collateral::Isolated));
        assert_eq!(config.exchange.pair_blacklist, vec!["BNB/USDT".to_string()]);
        assert_eq!(config.exchange.ohlcv_workers, 4);
        assert_eq!(config.order_types.stoploss_on_exchange_limit_ratio, dec!(0.99));
        assert_eq!(
            config.pairlists[0],
            PairlistConfig::VolumePairList {
                number_assets: 2,
                sort_key: VolumeSortKey::QuoteVolume
            }
        );
        assert_eq!(config.pairlists[2], PairlistConfig::AgeFilter { min_days_listed: 10 });
        assert_eq!(config.retry.max_retries, 4);
    }

    #[test]
    fn test_parse_error_converts() {
        let err = BotConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let exchange: ExchangeError = err.into();
        assert!(matches!(exchange, ExchangeError::Configuration(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = BotConfig::dynamic_spot();
        let json = serde_json::to_string(&config).unwrap();
        let back: BotConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pairlists, config.pairlists);
    }
}
