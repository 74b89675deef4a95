// 15.0: in-memory venue. serves fixed markets, tickers, candles and funding
// history, records every order, and can be told to fail the next N calls of
// an operation. drives the integration tests and the simulation binary.

use crate::leverage::RawLeverageBrackets;
use crate::market::Market;
use crate::ticker::Ticker;
use crate::types::Timestamp;
use crate::venue::{Candle, FundingRateEntry, OrderAck, Venue, VenueError, VenueOrderRequest};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Operation names used for failure queues and call counters.
pub mod ops {
    pub const LOAD_MARKETS: &str = "load_markets";
    pub const FETCH_TICKERS: &str = "fetch_tickers";
    pub const CREATE_ORDER: &str = "create_order";
    pub const SET_LEVERAGE: &str = "set_leverage";
    pub const LOAD_LEVERAGE_BRACKETS: &str = "load_leverage_brackets";
    pub const FETCH_OHLCV: &str = "fetch_ohlcv";
    pub const FETCH_FUNDING_RATE_HISTORY: &str = "fetch_funding_rate_history";
}

#[derive(Debug, Default)]
struct State {
    markets: Vec<Market>,
    tickers: Vec<Ticker>,
    brackets: RawLeverageBrackets,
    candles: HashMap<String, Vec<Candle>>,
    funding: HashMap<String, Vec<FundingRateEntry>>,
    failures: HashMap<&'static str, VecDeque<VenueError>>,
    calls: HashMap<&'static str, usize>,
    orders: Vec<VenueOrderRequest>,
    leverage: Vec<(String, Decimal)>,
    next_order_id: u64,
}

#[derive(Debug)]
pub struct ScriptedVenue {
    id: String,
    state: Mutex<State>,
}

impl ScriptedVenue {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_markets(self, markets: Vec<Market>) -> Self {
        self.state().markets = markets;
        self
    }

    pub fn with_tickers(self, tickers: Vec<Ticker>) -> Self {
        self.state().tickers = tickers;
        self
    }

    pub fn with_brackets(self, brackets: RawLeverageBrackets) -> Self {
        self.state().brackets = brackets;
        self
    }

    pub fn set_markets(&self, markets: Vec<Market>) {
        self.state().markets = markets;
    }

    pub fn set_tickers(&self, tickers: Vec<Ticker>) {
        self.state().tickers = tickers;
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.state().candles.insert(symbol.to_string(), candles);
    }

    pub fn set_funding_history(&self, symbol: &str, history: Vec<FundingRateEntry>) {
        self.state().funding.insert(symbol.to_string(), history);
    }

    /// The next call of `operation` fails with `error`. Queued failures are
    /// consumed in order before calls succeed again.
    pub fn fail_next(&self, operation: &'static str, error: VenueError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn submitted_orders(&self) -> Vec<VenueOrderRequest> {
        self.state().orders.clone()
    }

    pub fn leverage_calls(&self) -> Vec<(String, Decimal)> {
        self.state().leverage.clone()
    }

    /// Counts the call and pops a queued failure, if any.
    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>, VenueError> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(err) = state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

impl Venue for ScriptedVenue {
    fn id(&self) -> &str {
        &self.id
    }

    fn load_markets(&self) -> Result<Vec<Market>, VenueError> {
        Ok(self.enter(ops::LOAD_MARKETS)?.markets.clone())
    }

    fn fetch_tickers(&self) -> Result<Vec<Ticker>, VenueError> {
        Ok(self.enter(ops::FETCH_TICKERS)?.tickers.clone())
    }

    fn create_order(&self, request: &VenueOrderRequest) -> Result<OrderAck, VenueError> {
        let mut state = self.enter(ops::CREATE_ORDER)?;
        state.next_order_id += 1;
        let id = state.next_order_id.to_string();
        state.orders.push(request.clone());
        Ok(OrderAck {
            id: id.clone(),
            status: "open".to_string(),
            filled: Decimal::ZERO,
            average: None,
            raw: json!({
                "id": id,
                "symbol": request.symbol,
                "type": request.order_type,
                "side": request.side,
                "amount": request.amount,
                "price": request.price,
                "params": request.params,
            }),
        })
    }

    fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), VenueError> {
        self.enter(ops::SET_LEVERAGE)?
            .leverage
            .push((symbol.to_string(), leverage));
        Ok(())
    }

    fn load_leverage_brackets(&self) -> Result<RawLeverageBrackets, VenueError> {
        Ok(self.enter(ops::LOAD_LEVERAGE_BRACKETS)?.brackets.clone())
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        _timeframe: &str,
        since: Option<Timestamp>,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        let state = self.enter(ops::FETCH_OHLCV)?;
        let since = since.unwrap_or(Timestamp(i64::MIN));
        Ok(state
            .candles
            .get(symbol)
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.timestamp >= since)
                    .take(limit)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        since: Timestamp,
    ) -> Result<Vec<FundingRateEntry>, VenueError> {
        let state = self.enter(ops::FETCH_FUNDING_RATE_HISTORY)?;
        Ok(state
            .funding
            .get(symbol)
            .map(|history| history.iter().filter(|e| e.timestamp >= since).copied().collect())
            .unwrap_or_default())
    }
}
