// 8.2 exchange/leverage.rs: bracket table refresh, leverage queries,
// liquidation price and funding fees for the configured venue.

use super::core::Exchange;
use crate::error::ExchangeError;
use crate::funding::{calculate_funding_fees, funding_window_start};
use crate::leverage::LeverageTiers;
use crate::liquidation::{self, LiquidationInputs};
use crate::types::{Timestamp, TradingMode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

impl Exchange {
    /// Rebuilds the leverage bracket table. Dry-run reads the bundled table
    /// (or the configured file), live mode asks the venue. Spot and margin
    /// have no brackets and leave the table untouched.
    pub fn fill_leverage_brackets(&self) -> Result<usize, ExchangeError> {
        if self.settings.trading_mode != TradingMode::Futures {
            return Ok(0);
        }

        let tiers = if self.settings.dry_run {
            match &self.settings.leverage_brackets_file {
                Some(path) => LeverageTiers::from_file(path)?,
                None => LeverageTiers::bundled()?,
            }
        } else {
            let raw = self
                .call("load_leverage_brackets", |venue| venue.load_leverage_brackets())
                .map_err(|e| match e {
                    ExchangeError::Temporary(msg) => {
                        ExchangeError::Temporary(format!("Could not fetch leverage amounts due to {}", msg))
                    }
                    other => other,
                })?;
            LeverageTiers::from_raw(&raw)?
        };

        let pairs = tiers.len();
        self.brackets.store(tiers);
        info!(exchange = %self.caps.id, pairs, "leverage brackets loaded");
        Ok(pairs)
    }

    pub fn leverage_tiers(&self) -> Arc<LeverageTiers> {
        self.brackets.load()
    }

    pub fn get_max_leverage(&self, pair: &str, nominal_value: Decimal) -> Decimal {
        self.brackets.load().get_max_leverage(pair, nominal_value)
    }

    pub fn get_maintenance_ratio_and_amount(
        &self,
        pair: &str,
        nominal_value: Decimal,
    ) -> Result<(Decimal, Decimal), ExchangeError> {
        self.brackets.load().get_maintenance_ratio_and_amount(pair, nominal_value)
    }

    /// Liquidation price under the configured trading mode and collateral.
    pub fn liquidation_price(&self, pair: &str, inputs: &LiquidationInputs) -> Result<Option<Decimal>, ExchangeError> {
        liquidation::liquidation_price(pair, self.settings.trading_mode, self.settings.collateral, inputs)
    }

    /// Inputs for an isolated position with ratio and maintenance amount
    /// looked up from the bracket covering its nominal value.
    pub fn isolated_liquidation_inputs(
        &self,
        pair: &str,
        open_rate: Decimal,
        position: Decimal,
        is_short: bool,
        wallet_balance: Decimal,
    ) -> Result<LiquidationInputs, ExchangeError> {
        let nominal = position.abs() * open_rate;
        let (mm_ratio, maintenance_amount) = self.get_maintenance_ratio_and_amount(pair, nominal)?;
        Ok(LiquidationInputs {
            open_rate,
            is_short,
            position: Some(position),
            wallet_balance: Some(wallet_balance),
            maintenance_amount: Some(maintenance_amount),
            mm_ratio,
            other_positions_margin: None,
            other_positions_unrealized_pnl: None,
        })
    }

    /// Sets leverage on the venue before a futures order. No-op in dry-run
    /// and outside futures.
    pub fn set_leverage(&self, pair: &str, leverage: Decimal) -> Result<(), ExchangeError> {
        if self.settings.dry_run || self.settings.trading_mode != TradingMode::Futures {
            return Ok(());
        }
        self.call("set_leverage", |venue| venue.set_leverage(pair, leverage))
            .map_err(|e| match e {
                ExchangeError::Temporary(msg) => {
                    ExchangeError::Temporary(format!("Could not set leverage due to {}", msg))
                }
                other => other,
            })?;
        debug!(pair, %leverage, "leverage set");
        Ok(())
    }

    /// Funding fees of a position between `open_date` and `close_date`
    /// (now when still open). Positive = received.
    pub fn get_funding_fees(
        &self,
        pair: &str,
        amount: Decimal,
        is_short: bool,
        open_date: DateTime<Utc>,
        close_date: Option<DateTime<Utc>>,
    ) -> Result<Decimal, ExchangeError> {
        if self.settings.trading_mode != TradingMode::Futures {
            return Ok(Decimal::ZERO);
        }

        let start = Timestamp::from_datetime(funding_window_start(self.caps.kind, open_date));
        let end = Timestamp::from_datetime(close_date.unwrap_or_else(Utc::now));
        if end < start {
            return Ok(Decimal::ZERO);
        }

        let history = self.call("fetch_funding_rate_history", |venue| {
            venue.fetch_funding_rate_history(pair, start)
        })?;
        let fees = calculate_funding_fees(amount, is_short, &history, start, end);
        debug!(pair, %fees, settlements = history.len(), "funding fees computed");
        Ok(fees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::market::Market;
    use crate::retry::Shutdown;
    use crate::scripted::{ops, ScriptedVenue};
    use crate::types::Collateral;
    use crate::venue::{FundingRateEntry, VenueError};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn futures(dry_run: bool) -> BotConfig {
        let mut config = BotConfig::futures_isolated();
        config.dry_run = dry_run;
        config.retry.backoff_base_ms = 1;
        config.retry.backoff_max_ms = 2;
        config
    }

    fn venue() -> Arc<ScriptedVenue> {
        let mut brackets = HashMap::new();
        brackets.insert(
            "BTC/USDT:USDT".to_string(),
            vec![[dec!(0), dec!(0.02)], [dec!(50000), dec!(0.025)]],
        );
        Arc::new(
            ScriptedVenue::new("binance")
                .with_markets(vec![Market::perpetual("BTC/USDT:USDT", dec!(0.1), dec!(0.001))])
                .with_brackets(brackets),
        )
    }

    #[test]
    fn dry_run_uses_bundled_table() {
        let venue = venue();
        let exchange = Exchange::new(&futures(true), venue.clone(), Shutdown::new()).unwrap();
        assert!(exchange.fill_leverage_brackets().unwrap() > 0);
        assert_eq!(venue.calls(ops::LOAD_LEVERAGE_BRACKETS), 0);
        assert_eq!(exchange.get_max_leverage("BTC/USDT", dec!(0)), dec!(250));
    }

    #[test]
    fn live_fetches_from_venue_with_retry() {
        let venue = venue();
        venue.fail_next(ops::LOAD_LEVERAGE_BRACKETS, VenueError::Exchange("busy".into()));
        let exchange = Exchange::new(&futures(false), venue.clone(), Shutdown::new()).unwrap();

        assert_eq!(exchange.fill_leverage_brackets().unwrap(), 1);
        assert_eq!(venue.calls(ops::LOAD_LEVERAGE_BRACKETS), 2);
        assert_eq!(exchange.get_max_leverage("BTC/USDT:USDT", dec!(60000)), dec!(40));
        assert_eq!(
            exchange.get_maintenance_ratio_and_amount("BTC/USDT:USDT", dec!(60000)).unwrap(),
            (dec!(0.025), dec!(250))
        );
    }

    #[test]
    fn exhausted_bracket_fetch_is_temporary() {
        let venue = venue();
        for _ in 0..5 {
            venue.fail_next(ops::LOAD_LEVERAGE_BRACKETS, VenueError::Network("down".into()));
        }
        let exchange = Exchange::new(&futures(false), venue.clone(), Shutdown::new()).unwrap();
        let err = exchange.fill_leverage_brackets().unwrap_err();
        assert!(matches!(err, ExchangeError::Temporary(msg) if msg.starts_with("Could not fetch leverage amounts")));
        assert_eq!(venue.calls(ops::LOAD_LEVERAGE_BRACKETS), 5);
    }

    #[test]
    fn spot_skips_brackets_and_funding() {
        let venue = venue();
        let exchange = Exchange::new(&BotConfig::default(), venue.clone(), Shutdown::new()).unwrap();
        assert_eq!(exchange.fill_leverage_brackets().unwrap(), 0);
        assert!(exchange.leverage_tiers().is_empty());
        let fees = exchange
            .get_funding_fees("ETH/USDT", dec!(1), false, Utc::now(), None)
            .unwrap();
        assert_eq!(fees, Decimal::ZERO);
        assert_eq!(venue.calls(ops::FETCH_FUNDING_RATE_HISTORY), 0);
    }

    #[test]
    fn set_leverage_only_live_futures() {
        let venue = venue();
        let dry = Exchange::new(&futures(true), venue.clone(), Shutdown::new()).unwrap();
        dry.set_leverage("BTC/USDT:USDT", dec!(5)).unwrap();
        assert!(venue.leverage_calls().is_empty());

        let live = Exchange::new(&futures(false), venue.clone(), Shutdown::new()).unwrap();
        live.set_leverage("BTC/USDT:USDT", dec!(5)).unwrap();
        assert_eq!(venue.leverage_calls(), vec![("BTC/USDT:USDT".to_string(), dec!(5))]);
    }

    #[test]
    fn isolated_liquidation_from_brackets() {
        let exchange = Exchange::new(&futures(false), venue(), Shutdown::new()).unwrap();
        exchange.fill_leverage_brackets().unwrap();
        assert_eq!(exchange.collateral(), Some(Collateral::Isolated));

        let inputs = exchange
            .isolated_liquidation_inputs("BTC/USDT:USDT", dec!(30000), dec!(1), false, dec!(3000))
            .unwrap();
        assert_eq!(inputs.mm_ratio, dec!(0.02));
        let lp = exchange.liquidation_price("BTC/USDT:USDT", &inputs).unwrap().unwrap();
        // (3000 + 0 - 30000) / (0.02 - 1)
        assert_eq!(lp.round_dp(2), dec!(27551.02));
    }

    #[test]
    fn funding_fees_honour_cutoff() {
        let venue = venue();
        let at = |h: u32| Utc.with_ymd_and_hms(2021, 9, 1, h, 0, 0).unwrap();
        venue.set_funding_history(
            "BTC/USDT:USDT",
            vec![
                FundingRateEntry {
                    timestamp: Timestamp::from_datetime(at(8)),
                    rate: dec!(0.0001),
                    mark_price: dec!(40000),
                },
                FundingRateEntry {
                    timestamp: Timestamp::from_datetime(at(16)),
                    rate: dec!(0.0001),
                    mark_price: dec!(40000),
                },
            ],
        );
        let exchange = Exchange::new(&futures(false), venue, Shutdown::new()).unwrap();

        // opened 08:00:10, inside the cutoff: both settlements count
        let open = Utc.with_ymd_and_hms(2021, 9, 1, 8, 0, 10).unwrap();
        let fees = exchange
            .get_funding_fees("BTC/USDT:USDT", dec!(1), false, open, Some(at(20)))
            .unwrap();
        assert_eq!(fees, dec!(-8));

        // opened 08:00:20, past the cutoff: the 08:00 settlement is skipped
        let late = Utc.with_ymd_and_hms(2021, 9, 1, 8, 0, 20).unwrap();
        let fees = exchange
            .get_funding_fees("BTC/USDT:USDT", dec!(1), true, late, Some(at(20)))
            .unwrap();
        assert_eq!(fees, dec!(4));
    }
}
