//! Order intents, order records and the dry-run ledger.
//!
//! An [`OrderRequest`] is what the bot wants. It is built once, validated and
//! consumed by a single placement call. An [`OrderRecord`] is what came back:
//! either the venue's acknowledgement or a locally synthesized dry-run order.

use crate::error::ExchangeError;
use crate::types::{OrderKind, Side, TimeInForce, Timestamp};
use crate::venue::OrderAck;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default limit ratio for stop-limit orders placed on the exchange.
pub const DEFAULT_STOPLOSS_LIMIT_RATIO: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/// Trade intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub pair: String,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Decimal,
    /// Limit price. None for market orders.
    pub price: Option<Decimal>,
    pub leverage: Decimal,
    pub time_in_force: TimeInForce,
    /// Trigger price of stop-limit orders.
    pub stop_price: Option<Decimal>,
}

impl OrderRequest {
    pub fn market(pair: &str, side: Side, amount: Decimal) -> Self {
        Self {
            pair: pair.to_string(),
            side,
            kind: OrderKind::Market,
            amount,
            price: None,
            leverage: Decimal::ONE,
            time_in_force: TimeInForce::Gtc,
            stop_price: None,
        }
    }

    pub fn limit(pair: &str, side: Side, amount: Decimal, price: Decimal) -> Self {
        Self {
            kind: OrderKind::Limit,
            price: Some(price),
            ..Self::market(pair, side, amount)
        }
    }

    pub fn stop_limit(pair: &str, side: Side, amount: Decimal, stop_price: Decimal, limit_price: Decimal) -> Self {
        Self {
            kind: OrderKind::StopLimit,
            price: Some(limit_price),
            stop_price: Some(stop_price),
            ..Self::market(pair, side, amount)
        }
    }

    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Shape checks that need no market data.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidOrder(format!(
                "Order amount for {} must be positive, got {}",
                self.pair, self.amount
            )));
        }
        if self.leverage < Decimal::ONE {
            return Err(ExchangeError::InvalidOrder(format!(
                "Leverage for {} must be at least 1, got {}",
                self.pair, self.leverage
            )));
        }
        match self.kind {
            OrderKind::Market => Ok(()),
            OrderKind::Limit | OrderKind::StopLimit => {
                match self.price {
                    Some(price) if price > Decimal::ZERO => {}
                    _ => {
                        return Err(ExchangeError::InvalidOrder(format!(
                            "{} order for {} needs a positive price",
                            self.kind, self.pair
                        )))
                    }
                }
                if self.kind == OrderKind::StopLimit
                    && !matches!(self.stop_price, Some(stop) if stop > Decimal::ZERO)
                {
                    return Err(ExchangeError::InvalidOrder(format!(
                        "stop_limit order for {} needs a positive stop price",
                        self.pair
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Limit price for a stop-limit order. Sell stops rest below the trigger,
/// buy stops above it.
pub fn stoploss_limit_rate(stop_price: Decimal, side: Side, limit_ratio: Decimal) -> Decimal {
    match side {
        Side::Sell => stop_price * limit_ratio,
        Side::Buy => stop_price * (Decimal::TWO - limit_ratio),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
    Expired,
    Rejected,
}

impl OrderStatus {
    /// Maps a venue status string. Unknown values count as open.
    pub fn from_venue(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "closed" | "filled" => OrderStatus::Closed,
            "canceled" | "cancelled" => OrderStatus::Canceled,
            "expired" => OrderStatus::Expired,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Open,
        }
    }
}

/// An order as known after placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub pair: String,
    pub kind: OrderKind,
    pub side: Side,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub leverage: Decimal,
    pub status: OrderStatus,
    pub filled: Decimal,
    pub timestamp: Timestamp,
    pub dry_run: bool,
    /// Venue acknowledgement as received. Null for dry-run orders.
    #[serde(default)]
    pub raw: Value,
}

impl OrderRecord {
    pub fn from_ack(request: &OrderRequest, ack: OrderAck, timestamp: Timestamp) -> Self {
        Self {
            id: ack.id,
            pair: request.pair.clone(),
            kind: request.kind,
            side: request.side,
            amount: request.amount,
            price: ack.average.or(request.price),
            stop_price: request.stop_price,
            leverage: request.leverage,
            status: OrderStatus::from_venue(&ack.status),
            filled: ack.filled,
            timestamp,
            dry_run: false,
            raw: ack.raw,
        }
    }

    /// Local stand-in for a dry-run order. Market orders fill immediately at
    /// `fill_price`; everything else rests open.
    pub fn dry_run(id: String, request: &OrderRequest, fill_price: Option<Decimal>, timestamp: Timestamp) -> Self {
        let (status, filled, price) = match request.kind {
            OrderKind::Market => (OrderStatus::Closed, request.amount, fill_price.or(request.price)),
            OrderKind::Limit | OrderKind::StopLimit => (OrderStatus::Open, Decimal::ZERO, request.price),
        };
        Self {
            id,
            pair: request.pair.clone(),
            kind: request.kind,
            side: request.side,
            amount: request.amount,
            price,
            stop_price: request.stop_price,
            leverage: request.leverage,
            status,
            filled,
            timestamp,
            dry_run: true,
            raw: Value::Null,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    next_id: u64,
    orders: BTreeMap<String, OrderRecord>,
}

/// Orders synthesized in dry-run, optionally persisted as JSON.
#[derive(Debug, Default)]
pub struct DryRunLedger {
    next_id: u64,
    orders: BTreeMap<String, OrderRecord>,
    path: Option<PathBuf>,
}

impl DryRunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger backed by `path`. Existing contents are loaded.
    pub fn with_file(path: &Path) -> Result<Self, ExchangeError> {
        let mut ledger = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };
        if path.exists() {
            let json = std::fs::read_to_string(path).map_err(|e| {
                ExchangeError::Configuration(format!(
                    "Could not read dry-run orders from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let file: LedgerFile = serde_json::from_str(&json).map_err(|e| {
                ExchangeError::Configuration(format!(
                    "Could not parse dry-run orders in {}: {}",
                    path.display(),
                    e
                ))
            })?;
            ledger.next_id = file.next_id;
            ledger.orders = file.orders;
            debug!(orders = ledger.orders.len(), path = %path.display(), "loaded dry-run orders");
        }
        Ok(ledger)
    }

    pub fn next_order_id(&mut self) -> String {
        self.next_id += 1;
        format!("dry_run_{}", self.next_id)
    }

    /// Stores `record` and persists the ledger when file backed. A failed
    /// write leaves the ledger as it was.
    pub fn insert(&mut self, record: OrderRecord) -> Result<(), ExchangeError> {
        let id = record.id.clone();
        let previous = self.orders.insert(id.clone(), record);
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.orders.insert(id, old),
                None => self.orders.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&OrderRecord> {
        self.orders.get(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn save(&self) -> Result<(), ExchangeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = LedgerFile {
            next_id: self.next_id,
            orders: self.orders.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| ExchangeError::Operational(format!("Could not encode dry-run orders: {}", e)))?;
        std::fs::write(path, json).map_err(|e| {
            ExchangeError::Operational(format!(
                "Could not write dry-run orders to {}: {}",
                path.display(),
                e
            ))
        })
    }
}
