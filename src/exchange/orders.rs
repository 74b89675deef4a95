//! Order and stoploss placement.
//!
//! Every attempt runs BUILD -> VALIDATE -> (DRY_RUN | SUBMIT) -> RESULT.
//! Orders are submitted exactly once: placement runs with a zero retry budget
//! and a failure is reported to the caller instead of being retried.

use super::core::Exchange;
use crate::error::ExchangeError;
use crate::order::{stoploss_limit_rate, OrderRecord, OrderRequest};
use crate::retry::RetryPolicy;
use crate::types::{OrderKind, Side, TimeInForce, Timestamp, TradingMode};
use crate::venue::{VenueError, VenueOrderRequest};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Adds placement context to a venue failure.
fn classify_order_error(err: VenueError, request: &VenueOrderRequest) -> ExchangeError {
    let attempted = format!(
        "Tried to {} amount {} at rate {} on market {}",
        request.side,
        request.amount,
        request
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "market".to_string()),
        request.symbol
    );
    match err {
        VenueError::InsufficientFunds(msg) => ExchangeError::InsufficientFunds(format!(
            "Insufficient funds to create {} {} order. {}. Message: {}",
            request.order_type, request.side, attempted, msg
        )),
        VenueError::InvalidOrder(msg) => ExchangeError::InvalidOrder(format!(
            "Could not create {} {} order. {}. Message: {}",
            request.order_type, request.side, attempted, msg
        )),
        VenueError::DDosProtection(msg) => ExchangeError::DDosProtection(msg),
        e @ (VenueError::Network(_) | VenueError::Exchange(_)) => ExchangeError::Temporary(format!(
            "Could not place {} order due to {}. Message: {}",
            request.side,
            e.kind_name(),
            e
        )),
        e @ (VenueError::NotSupported(_) | VenueError::Other(_)) => ExchangeError::Operational(e.to_string()),
    }
}

impl Exchange {
    /// Places a market, limit or stop-limit order, or records it locally in
    /// dry-run.
    pub fn create_order(&self, request: OrderRequest) -> Result<OrderRecord, ExchangeError> {
        request.validate()?;

        if request.kind != OrderKind::Market && !self.caps.supports_time_in_force(request.time_in_force) {
            return Err(ExchangeError::Configuration(format!(
                "{} does not support time in force {}",
                self.caps.id,
                request.time_in_force.as_str()
            )));
        }

        let market = self.market(&request.pair)?;
        let amount = crate::precision::amount_to_precision(&market, request.amount);
        let price = request
            .price
            .map(|p| crate::precision::price_to_precision(&market, p));
        let stop_price = request
            .stop_price
            .map(|p| crate::precision::price_to_precision(&market, p));

        // market orders are checked and simulated against the last traded price
        let reference_price = match price {
            Some(p) => Some(p),
            None => self.last_price(&request.pair)?,
        };

        market.check_limits(amount, reference_price)?;

        let rounded = OrderRequest {
            amount,
            price,
            stop_price,
            ..request
        };

        if self.settings.trading_mode == TradingMode::Futures {
            self.check_leverage(&rounded, reference_price)?;
        }

        if self.settings.dry_run {
            return self.dry_run_order(&rounded, reference_price);
        }

        let order_type = match rounded.kind {
            OrderKind::Market => "market",
            OrderKind::Limit => "limit",
            OrderKind::StopLimit => self.caps.stoploss_order_type,
        };

        let mut params = BTreeMap::new();
        if rounded.kind != OrderKind::Market && rounded.time_in_force != TimeInForce::Gtc {
            params.insert(
                self.caps.time_in_force_parameter.to_string(),
                Value::String(rounded.time_in_force.as_str().to_uppercase()),
            );
        }
        let mut venue_price = rounded.price;
        if let Some(stop) = rounded.stop_price {
            let layout = self.caps.kind.stoploss_layout(stop, rounded.price.unwrap_or(stop));
            venue_price = Some(layout.price);
            params.extend(layout.params.into_iter().map(|(k, v)| (k, json!(v))));
        }

        let venue_request = VenueOrderRequest {
            symbol: rounded.pair.clone(),
            order_type: order_type.to_string(),
            side: rounded.side,
            amount: rounded.amount,
            price: venue_price,
            params,
        };

        self.submit(&rounded, venue_request)
    }

    /// Places a stop-limit order protecting a position.
    ///
    /// `side` is the side of the stop order itself: sell for long positions,
    /// buy for shorts. The limit price sits beyond the trigger in the fill
    /// direction, scaled by `stoploss_on_exchange_limit_ratio`.
    pub fn place_stoploss(
        &self,
        pair: &str,
        amount: Decimal,
        stop_price: Decimal,
        side: Side,
        leverage: Decimal,
    ) -> Result<OrderRecord, ExchangeError> {
        if !self.caps.stoploss_on_exchange {
            return Err(ExchangeError::Configuration(format!(
                "stoploss on exchange is not implemented for {}",
                self.caps.id
            )));
        }

        // BUILD
        let market = self.market(pair)?;
        let stop_price = crate::precision::price_to_precision(&market, stop_price);
        let limit_rate = stoploss_limit_rate(stop_price, side, self.settings.stoploss_limit_ratio);
        let rate = crate::precision::price_to_precision(&market, limit_rate);

        // VALIDATE on the rounded limit, a coarse tick can pull it onto the trigger
        let bad_stop = match side {
            Side::Sell => rate >= stop_price,
            Side::Buy => rate <= stop_price,
        };
        if bad_stop {
            let relation = match side {
                Side::Sell => "more",
                Side::Buy => "less",
            };
            return Err(ExchangeError::Configuration(format!(
                "In stoploss limit order, stop price should be {} than limit price. \
                 Stop price: {}, Limit price: {}, Limit Rate: {}",
                relation, stop_price, rate, self.settings.stoploss_limit_ratio
            )));
        }

        let amount = crate::precision::amount_to_precision(&market, amount);
        market.check_limits(amount, Some(rate))?;

        let request = OrderRequest::stop_limit(pair, side, amount, stop_price, rate).with_leverage(leverage);
        request.validate()?;

        if self.settings.trading_mode == TradingMode::Futures {
            self.check_leverage(&request, Some(rate))?;
        }

        // DRY_RUN
        if self.settings.dry_run {
            return self.dry_run_order(&request, None);
        }

        // SUBMIT
        let layout = self.caps.kind.stoploss_layout(stop_price, rate);
        let venue_request = VenueOrderRequest {
            symbol: pair.to_string(),
            order_type: self.caps.stoploss_order_type.to_string(),
            side,
            amount,
            price: Some(layout.price),
            params: layout
                .params
                .into_iter()
                .map(|(k, v)| (k, json!(v)))
                .collect(),
        };

        let record = self.submit(&request, venue_request)?;
        info!(
            pair,
            stop_price = %stop_price,
            limit_price = %rate,
            order_id = %record.id,
            "stoploss limit order added"
        );
        Ok(record)
    }

    /// True when the existing stop order should be replaced by one at
    /// `stop_loss`: it must be the venue's stop-limit order and the new
    /// trigger must be strictly more favourable.
    pub fn stoploss_adjust(&self, stop_loss: Decimal, order: &OrderRecord, side: Side) -> bool {
        if order.kind != OrderKind::StopLimit {
            return false;
        }
        let Some(current) = order.stop_price else {
            return false;
        };
        match side {
            Side::Sell => stop_loss > current,
            Side::Buy => stop_loss < current,
        }
    }

    /// Dry-run order by id.
    pub fn fetch_dry_run_order(&self, id: &str) -> Option<OrderRecord> {
        self.ledger().get(id).cloned()
    }

    fn last_price(&self, pair: &str) -> Result<Option<Decimal>, ExchangeError> {
        let tickers = self.fetch_tickers()?;
        Ok(tickers.get(pair).and_then(|t| t.last))
    }

    fn check_leverage(&self, request: &OrderRequest, reference_price: Option<Decimal>) -> Result<(), ExchangeError> {
        let Some(price) = reference_price else {
            warn!(pair = %request.pair, "no price to check leverage against");
            return Ok(());
        };
        let nominal = request.amount * price;
        let max_leverage = self.get_max_leverage(&request.pair, nominal);
        if request.leverage > max_leverage {
            return Err(ExchangeError::InvalidOrder(format!(
                "Leverage {} exceeds maximum {} for {} at nominal value {}",
                request.leverage, max_leverage, request.pair, nominal
            )));
        }
        Ok(())
    }

    fn dry_run_order(&self, request: &OrderRequest, fill_price: Option<Decimal>) -> Result<OrderRecord, ExchangeError> {
        let mut ledger = self.ledger();
        let id = ledger.next_order_id();
        let record = OrderRecord::dry_run(id, request, fill_price, Timestamp::now());
        ledger.insert(record.clone())?;
        info!(
            pair = %record.pair,
            order_id = %record.id,
            kind = %record.kind,
            side = %record.side,
            amount = %record.amount,
            "dry-run order recorded"
        );
        Ok(record)
    }

    fn submit(&self, request: &OrderRequest, venue_request: VenueOrderRequest) -> Result<OrderRecord, ExchangeError> {
        self.set_leverage(&request.pair, request.leverage)?;

        let ack = self.call_with(RetryPolicy::none(), "create_order", |venue| {
            venue
                .create_order(&venue_request)
                .map_err(|e| classify_order_error(e, &venue_request))
        })?;

        info!(pair = %request.pair, order_id = %ack.id, raw = %ack.raw, "order acknowledged");
        Ok(OrderRecord::from_ack(request, ack, Timestamp::now()))
    }
}
