// 1.0: primitives shared by every module. order sides, trading modes, collateral,
// order kinds, time in force and millisecond timestamps.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// Buy = order that acquires base. Sell = order that releases base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => dec!(1),
            Side::Sell => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 1.1: what kind of account the bot trades with. spot is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Spot,
    Margin,
    Futures,
}

impl Default for TradingMode {
    fn default() -> Self {
        Self::Spot
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TradingMode::Spot => "spot",
            TradingMode::Margin => "margin",
            TradingMode::Futures => "futures",
        };
        f.write_str(name)
    }
}

// 1.2: isolated = each position has its own wallet. cross = one shared wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collateral {
    Isolated,
    Cross,
}

impl fmt::Display for Collateral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collateral::Isolated => "isolated",
            Collateral::Cross => "cross",
        };
        f.write_str(name)
    }
}

/// Order kind as sent to the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Executes at best available price.
    Market,
    /// Rests at a fixed price.
    Limit,
    /// Becomes a limit order once the stop trigger is touched.
    StopLimit,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderKind::Market => "market",
            OrderKind::Limit => "limit",
            OrderKind::StopLimit => "stop_limit",
        };
        f.write_str(name)
    }
}

/// Order time in force options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good till canceled.
    Gtc,
    /// Fill or kill.
    Fok,
    /// Immediate or cancel.
    Ioc,
    /// Post only. Rejected if it would take liquidity.
    #[serde(rename = "po")]
    PostOnly,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Gtc
    }
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "gtc",
            TimeInForce::Fok => "fok",
            TimeInForce::Ioc => "ioc",
            TimeInForce::PostOnly => "po",
        }
    }
}

// 1.3: millisecond timestamp. venues report candle and funding times this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

// 1.4: timeframe strings like "5m" or "1d" to milliseconds.
pub fn timeframe_to_millis(timeframe: &str) -> Option<i64> {
    let (split, _) = timeframe.char_indices().last()?;
    let (amount, unit) = timeframe.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    if amount <= 0 {
        return None;
    }
    let unit_ms = match unit {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 604_800_000,
        _ => return None,
    };
    amount.checked_mul(unit_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_operations() {
        assert_eq!(Side::Buy.sign(), dec!(1));
        assert_eq!(Side::Sell.sign(), dec!(-1));
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.to_string(), "sell");
    }

    #[test]
    fn timeframe_parsing() {
        assert_eq!(timeframe_to_millis("1m"), Some(60_000));
        assert_eq!(timeframe_to_millis("4h"), Some(14_400_000));
        assert_eq!(timeframe_to_millis("1d"), Some(86_400_000));
        assert_eq!(timeframe_to_millis("d"), None);
        assert_eq!(timeframe_to_millis("0m"), None);
        assert_eq!(timeframe_to_millis("3y"), None);
        assert_eq!(timeframe_to_millis(""), None);
        assert_eq!(timeframe_to_millis("1é"), None);
        assert_eq!(timeframe_to_millis("é"), None);
        assert_eq!(timeframe_to_millis("9223372036854775807w"), None);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&TradingMode::Futures).unwrap(), "\"futures\"");
        assert_eq!(serde_json::to_string(&Collateral::Cross).unwrap(), "\"cross\"");
        assert_eq!(serde_json::to_string(&TimeInForce::PostOnly).unwrap(), "\"po\"");
        let kind: OrderKind = serde_json::from_str("\"stop_limit\"").unwrap();
        assert_eq!(kind, OrderKind::StopLimit);
    }

    #[test]
    fn timestamp_round_trips_datetime() {
        let ts = Timestamp::from_millis(1_640_995_200_000); // 2022-01-01T00:00:00Z
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from_datetime(dt), ts);
    }
}
