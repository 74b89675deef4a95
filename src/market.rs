//! Market metadata as loaded from the venue.
//!
//! A market is one tradable symbol ("ETH/USDT", or "ETH/USDT:USDT" for a
//! linear perpetual) with its precision and order limits.

use crate::error::ExchangeError;
use crate::precision::Precision;
use crate::types::{Timestamp, TradingMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static market metadata. Replaced wholesale whenever markets are reloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub active: bool,
    /// Spot market. False for derivatives.
    #[serde(default = "default_true")]
    pub spot: bool,
    /// Perpetual or dated futures contract.
    #[serde(default)]
    pub futures: bool,
    pub price_precision: Precision,
    pub amount_precision: Precision,
    /// Minimum order amount in base currency.
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    /// Minimum order value in quote currency.
    #[serde(default)]
    pub min_cost: Option<Decimal>,
    /// Listing time when the venue reports it.
    #[serde(default)]
    pub listed_at: Option<Timestamp>,
}

fn default_true() -> bool {
    true
}

impl Market {
    /// Spot market with decimal-place precision, handy for fixtures.
    pub fn spot(symbol: &str, price_decimals: u32, amount_decimals: u32) -> Self {
        let (base, quote) = split_symbol(symbol).unwrap_or((symbol, ""));
        Self {
            symbol: symbol.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            active: true,
            spot: true,
            futures: false,
            price_precision: Precision::DecimalPlaces(price_decimals),
            amount_precision: Precision::DecimalPlaces(amount_decimals),
            min_amount: None,
            min_cost: None,
            listed_at: None,
        }
    }

    /// Linear perpetual with tick/lot precision.
    pub fn perpetual(symbol: &str, tick_size: Decimal, lot_size: Decimal) -> Self {
        let (base, quote) = split_symbol(symbol).unwrap_or((symbol, ""));
        Self {
            symbol: symbol.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            active: true,
            spot: false,
            futures: true,
            price_precision: Precision::TickSize(tick_size),
            amount_precision: Precision::TickSize(lot_size),
            min_amount: None,
            min_cost: None,
            listed_at: None,
        }
    }

    /// Whether this market is traded in the given mode.
    pub fn tradable_in(&self, mode: TradingMode) -> bool {
        match mode {
            TradingMode::Spot | TradingMode::Margin => self.spot,
            TradingMode::Futures => self.futures,
        }
    }

    /// Check amount and order value against the venue's minimums. The value
    /// check is skipped when no price is known yet.
    pub fn check_limits(&self, amount: Decimal, price: Option<Decimal>) -> Result<(), ExchangeError> {
        if let Some(min_amount) = self.min_amount {
            if amount < min_amount {
                return Err(ExchangeError::InvalidOrder(format!(
                    "Amount {} for {} below minimum {}",
                    amount, self.symbol, min_amount
                )));
            }
        }
        if let (Some(min_cost), Some(price)) = (self.min_cost, price) {
            let cost = amount * price;
            if cost < min_cost {
                return Err(ExchangeError::InvalidOrder(format!(
                    "Order value {} for {} below minimum {}",
                    cost, self.symbol, min_cost
                )));
            }
        }
        Ok(())
    }
}

/// "BTC/USDT" -> ("BTC", "USDT"), "BTC/USDT:USDT" -> ("BTC", "USDT").
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    let (base, rest) = symbol.split_once('/')?;
    let quote = rest.split_once(':').map(|(q, _)| q).unwrap_or(rest);
    if base.is_empty() || quote.is_empty() {
        return None;
    }
    Some((base, quote))
}

/// All markets of one venue, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    markets: HashMap<String, Market>,
}

impl MarketCatalog {
    pub fn new(markets: Vec<Market>) -> Self {
        Self {
            markets: markets.into_iter().map(|m| (m.symbol.clone(), m)).collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    /// Market metadata, or a configuration error naming the pair.
    pub fn require(&self, symbol: &str) -> Result<&Market, ExchangeError> {
        self.markets.get(symbol).ok_or_else(|| {
            ExchangeError::Configuration(format!("Market metadata for {} not loaded", symbol))
        })
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Active symbols quoted in `quote` and tradable in `mode`, sorted by symbol.
    pub fn active_symbols(&self, quote: &str, mode: TradingMode) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .markets
            .values()
            .filter(|m| m.active && m.quote == quote && m.tradable_in(mode))
            .map(|m| m.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }
}
