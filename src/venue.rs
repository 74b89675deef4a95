// 4.0: the remote exchange as seen by this crate. every call is blocking I/O
// and fails with a venue-native VenueError. nothing outside exchange/ and
// retry.rs ever matches on VenueError; it is classified into ExchangeError first.

use crate::error::ExchangeError;
use crate::leverage::RawLeverageBrackets;
use crate::market::Market;
use crate::ticker::Ticker;
use crate::types::{Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Failures as reported by the venue client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("rate limited: {0}")]
    DDosProtection(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

impl VenueError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            VenueError::InsufficientFunds(_) => "InsufficientFunds",
            VenueError::InvalidOrder(_) => "InvalidOrder",
            VenueError::DDosProtection(_) => "DDoSProtection",
            VenueError::Network(_) => "NetworkError",
            VenueError::Exchange(_) => "ExchangeError",
            VenueError::NotSupported(_) => "NotSupported",
            VenueError::Other(_) => "BaseError",
        }
    }
}

/// Default classification for calls without order-specific context.
impl From<VenueError> for ExchangeError {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::InsufficientFunds(msg) => ExchangeError::InsufficientFunds(msg),
            VenueError::InvalidOrder(msg) => ExchangeError::InvalidOrder(msg),
            VenueError::DDosProtection(msg) => ExchangeError::DDosProtection(msg),
            e @ (VenueError::Network(_) | VenueError::Exchange(_)) => {
                ExchangeError::Temporary(format!("{}: {}", e.kind_name(), e))
            }
            e @ (VenueError::NotSupported(_) | VenueError::Other(_)) => {
                ExchangeError::Operational(e.to_string())
            }
        }
    }
}

/// Order as handed to the venue: names and params already venue specific.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueOrderRequest {
    pub symbol: String,
    /// Venue order type name, e.g. "limit" or "stop_loss_limit".
    pub order_type: String,
    pub side: Side,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub params: BTreeMap<String, Value>,
}

/// Venue acknowledgement of a created order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub filled: Decimal,
    #[serde(default)]
    pub average: Option<Decimal>,
    /// Raw response, kept for audit logs.
    #[serde(default)]
    pub raw: Value,
}

/// One OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// One funding settlement from the venue's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRateEntry {
    pub timestamp: Timestamp,
    pub rate: Decimal,
    pub mark_price: Decimal,
}

/// Blocking client for one remote exchange.
pub trait Venue: Send + Sync {
    fn id(&self) -> &str;

    fn load_markets(&self) -> Result<Vec<Market>, VenueError>;

    fn fetch_tickers(&self) -> Result<Vec<Ticker>, VenueError>;

    fn create_order(&self, request: &VenueOrderRequest) -> Result<OrderAck, VenueError>;

    fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), VenueError>;

    /// Pair -> ascending `[notional_floor, maintenance_margin_ratio]` rows.
    fn load_leverage_brackets(&self) -> Result<RawLeverageBrackets, VenueError>;

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<Timestamp>,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError>;

    fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        since: Timestamp,
    ) -> Result<Vec<FundingRateEntry>, VenueError>;
}
