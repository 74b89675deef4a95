//! Per-exchange capability table.
//!
//! Venues differ in which order types, time-in-force values and trading modes
//! they accept. Those differences are plain data here, selected by exchange
//! identifier. The few places where venues need different algorithms (stoploss
//! parameter layout, funding cutoff) hang off [`VenueKind`].

use crate::types::{Collateral, TimeInForce, TradingMode};
use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How trade history is paged by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradesPagination {
    Time,
    Id,
}

/// Venues with their own algorithmic quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Binance,
    Kraken,
    Generic,
}

/// Price and extra parameters of a stop-limit order as the venue expects them.
#[derive(Debug, Clone, PartialEq)]
pub struct StoplossLayout {
    pub price: Decimal,
    pub params: BTreeMap<String, Decimal>,
}

impl VenueKind {
    /// Binance wants the limit as price and the trigger as `stopPrice`.
    /// Kraken wants the trigger as price and the limit as `price2`.
    pub fn stoploss_layout(&self, stop_price: Decimal, limit_price: Decimal) -> StoplossLayout {
        let mut params = BTreeMap::new();
        match self {
            VenueKind::Kraken => {
                params.insert("price2".to_string(), limit_price);
                StoplossLayout { price: stop_price, params }
            }
            VenueKind::Binance | VenueKind::Generic => {
                params.insert("stopPrice".to_string(), stop_price);
                StoplossLayout { price: limit_price, params }
            }
        }
    }

    /// True when a position opened at `open_date` is not charged funding for
    /// the hour it was opened in.
    pub fn funding_fee_cutoff(&self, open_date: DateTime<Utc>) -> bool {
        match self {
            // binance settles a few seconds after the hour
            VenueKind::Binance => {
                open_date.minute() > 0 || (open_date.minute() == 0 && open_date.second() > 15)
            }
            VenueKind::Kraken | VenueKind::Generic => {
                open_date.minute() > 0 || (open_date.minute() == 0 && open_date.second() > 0)
            }
        }
    }
}

/// Static feature flags for one exchange. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCapabilities {
    pub id: String,
    pub kind: VenueKind,
    pub stoploss_on_exchange: bool,
    /// Venue name for its stop-limit order type.
    pub stoploss_order_type: &'static str,
    pub order_time_in_force: Vec<TimeInForce>,
    pub time_in_force_parameter: &'static str,
    pub ohlcv_candle_limit: usize,
    pub trades_pagination: TradesPagination,
    pub trades_pagination_arg: &'static str,
    /// Allowed order book depths. None = any depth.
    pub l2_limit_range: Option<Vec<u32>>,
    /// Supported non-spot combinations. Spot is always supported.
    pub supported_modes: Vec<(TradingMode, Collateral)>,
}

impl ExchangeCapabilities {
    fn binance() -> Self {
        Self {
            id: "binance".to_string(),
            kind: VenueKind::Binance,
            stoploss_on_exchange: true,
            stoploss_order_type: "stop_loss_limit",
            order_time_in_force: vec![TimeInForce::Gtc, TimeInForce::Fok, TimeInForce::Ioc],
            time_in_force_parameter: "timeInForce",
            ohlcv_candle_limit: 1000,
            trades_pagination: TradesPagination::Id,
            trades_pagination_arg: "fromId",
            l2_limit_range: Some(vec![5, 10, 20, 50, 100, 500, 1000]),
            // margin and cross futures are not wired up yet
            supported_modes: vec![(TradingMode::Futures, Collateral::Isolated)],
        }
    }

    fn kraken() -> Self {
        Self {
            id: "kraken".to_string(),
            kind: VenueKind::Kraken,
            stoploss_on_exchange: true,
            stoploss_order_type: "stop-loss-limit",
            order_time_in_force: vec![TimeInForce::Gtc],
            time_in_force_parameter: "timeInForce",
            ohlcv_candle_limit: 720,
            trades_pagination: TradesPagination::Id,
            trades_pagination_arg: "since",
            l2_limit_range: None,
            supported_modes: Vec::new(),
        }
    }

    fn generic(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: VenueKind::Generic,
            stoploss_on_exchange: false,
            stoploss_order_type: "stop_loss_limit",
            order_time_in_force: vec![TimeInForce::Gtc],
            time_in_force_parameter: "timeInForce",
            ohlcv_candle_limit: 500,
            trades_pagination: TradesPagination::Time,
            trades_pagination_arg: "since",
            l2_limit_range: None,
            supported_modes: Vec::new(),
        }
    }

    pub fn supports(&self, trading_mode: TradingMode, collateral: Option<Collateral>) -> bool {
        match (trading_mode, collateral) {
            (TradingMode::Spot, _) => true,
            (mode, Some(collateral)) => self.supported_modes.contains(&(mode, collateral)),
            (_, None) => false,
        }
    }

    pub fn supports_time_in_force(&self, tif: TimeInForce) -> bool {
        self.order_time_in_force.contains(&tif)
    }

    /// Smallest allowed depth that covers `limit`, or the largest allowed depth.
    pub fn order_book_depth(&self, limit: u32) -> u32 {
        let Some(range) = &self.l2_limit_range else {
            return limit;
        };
        range
            .iter()
            .copied()
            .filter(|&depth| depth >= limit)
            .min()
            .or_else(|| range.iter().copied().max())
            .unwrap_or(limit)
    }
}

/// Capability record for an exchange identifier. Unknown venues get the
/// conservative default: no stoploss on exchange, no futures.
pub fn capabilities_for(exchange_id: &str) -> ExchangeCapabilities {
    match exchange_id.to_ascii_lowercase().as_str() {
        "binance" => ExchangeCapabilities::binance(),
        "kraken" => ExchangeCapabilities::kraken(),
        other => ExchangeCapabilities::generic(other),
    }
}
