//! Property-based tests for the bracket math, rounding and pair filters.
//!
//! These tests verify invariants hold under random inputs.

use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use trade_core::leverage::RawLeverageBrackets;
use trade_core::order::stoploss_limit_rate;
use trade_core::pairlist::{FilterContext, LogOnce, PairlistFilter, PriceFilter};
use trade_core::precision::round_to_precision;
use trade_core::*;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 10,000
}

fn ratio_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1000i64).prop_map(|x| Decimal::new(x, 3)) // 0.001 to 0.999
}

fn nominal_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000i64).prop_map(Decimal::from)
}

/// Floors start at zero and grow, maintenance ratios never shrink.
fn brackets_strategy() -> impl Strategy<Value = Vec<[Decimal; 2]>> {
    prop::collection::vec((1i64..5_000_000i64, 1i64..50i64), 1..8).prop_map(|steps| {
        let mut floor = Decimal::ZERO;
        let mut mmr = Decimal::ZERO;
        let mut rows = Vec::with_capacity(steps.len());
        for (i, (gap, bump)) in steps.into_iter().enumerate() {
            if i > 0 {
                floor += Decimal::from(gap);
            }
            mmr += Decimal::new(bump, 4);
            rows.push([floor, mmr]);
        }
        rows
    })
}

fn tiers(rows: Vec<[Decimal; 2]>) -> LeverageTiers {
    let mut raw: RawLeverageBrackets = HashMap::new();
    raw.insert("BTC/USDT".to_string(), rows);
    LeverageTiers::from_raw(&raw).unwrap()
}

fn exchange_with(markets: Vec<Market>) -> Exchange {
    let venue = Arc::new(ScriptedVenue::new("binance").with_markets(markets));
    let exchange = Exchange::new(&BotConfig::default(), venue, Shutdown::new()).unwrap();
    exchange.reload_markets().unwrap();
    exchange
}

fn run_price_filter(filter: &PriceFilter, lasts: &[Decimal]) -> (Vec<String>, Vec<String>) {
    let pairs: Vec<String> = (0..lasts.len()).map(|i| format!("P{}/USDT", i)).collect();
    let markets = pairs.iter().map(|p| Market::spot(p, 8, 2)).collect();
    let tickers = pairs
        .iter()
        .zip(lasts)
        .map(|(p, last)| Ticker::new(p).with_last(*last))
        .collect();
    let exchange = exchange_with(markets);
    let snapshot = TickerSnapshot::new(tickers, Timestamp(0));
    let log = LogOnce::new();
    let ctx = FilterContext {
        exchange: &exchange,
        tickers: Some(&snapshot),
        log: &log,
    };
    let kept = filter.filter_pairlist(pairs.clone(), &ctx).unwrap();
    (pairs, kept)
}

proptest! {
    /// Larger positions never get more leverage
    #[test]
    fn max_leverage_non_increasing(
        rows in brackets_strategy(),
        a in nominal_strategy(),
        b in nominal_strategy(),
    ) {
        let tiers = tiers(rows);
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(tiers.get_max_leverage("BTC/USDT", small) >= tiers.get_max_leverage("BTC/USDT", large));
    }

    /// Pairs without brackets trade at 1x
    #[test]
    fn unknown_pair_is_one(rows in brackets_strategy(), nominal in nominal_strategy()) {
        let tiers = tiers(rows);
        prop_assert_eq!(tiers.get_max_leverage("XRP/EUR", nominal), Decimal::ONE);
    }

    /// Cumulative maintenance amount is never negative and never shrinks
    #[test]
    fn cumulative_maintenance_grows(rows in brackets_strategy()) {
        let tiers = tiers(rows);
        let brackets = tiers.brackets("BTC/USDT").unwrap();
        prop_assert_eq!(brackets[0].maintenance_amount, Decimal::ZERO);
        for pair in brackets.windows(2) {
            prop_assert!(pair[1].maintenance_amount >= pair[0].maintenance_amount);
        }
    }

    /// Sell stops fill below the trigger, buy stops above
    #[test]
    fn stoploss_limit_beyond_trigger(stop in price_strategy(), ratio in ratio_strategy()) {
        prop_assert!(stoploss_limit_rate(stop, Side::Sell, ratio) < stop);
        prop_assert!(stoploss_limit_rate(stop, Side::Buy, ratio) > stop);
    }

    /// Placed stops keep the limit beyond the trigger after tick rounding, or are refused
    #[test]
    fn placed_stoploss_limit_beyond_trigger(
        stop in price_strategy(),
        ratio in ratio_strategy(),
        places in 0u32..5u32,
        is_sell in any::<bool>(),
    ) {
        let mut config = BotConfig::default();
        config.order_types.stoploss_on_exchange_limit_ratio = ratio;
        let venue = Arc::new(ScriptedVenue::new("binance").with_markets(vec![Market::spot("ETH/USDT", places, 2)]));
        let exchange = Exchange::new(&config, venue, Shutdown::new()).unwrap();
        exchange.reload_markets().unwrap();

        let side = if is_sell { Side::Sell } else { Side::Buy };
        match exchange.place_stoploss("ETH/USDT", Decimal::ONE, stop, side, Decimal::ONE) {
            Ok(order) => {
                let (limit, trigger) = (order.price.unwrap(), order.stop_price.unwrap());
                match side {
                    Side::Sell => prop_assert!(limit < trigger),
                    Side::Buy => prop_assert!(limit > trigger),
                }
            }
            Err(e) => prop_assert!(matches!(e, ExchangeError::Configuration(_)), "unexpected error {:?}", e),
        }
    }

    /// Rounding twice changes nothing
    #[test]
    fn precision_idempotent(value in price_strategy(), places in 0u32..8u32, tick in 1i64..1000i64) {
        for precision in [Precision::DecimalPlaces(places), Precision::TickSize(Decimal::new(tick, 3))] {
            for strategy in [RoundingStrategy::MidpointAwayFromZero, RoundingStrategy::ToZero] {
                let once = round_to_precision(value, precision, strategy);
                prop_assert_eq!(round_to_precision(once, precision, strategy), once);
            }
        }
    }

    /// Spot positions never have a liquidation price
    #[test]
    fn spot_never_liquidates(open_rate in price_strategy(), is_short in any::<bool>()) {
        let inputs = LiquidationInputs { open_rate, is_short, ..LiquidationInputs::default() };
        prop_assert_eq!(liquidation_price("BTC/USDT", TradingMode::Spot, None, &inputs).unwrap(), None);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A price filter with every threshold at zero keeps every pair
    #[test]
    fn disabled_price_filter_keeps_all(
        lasts in prop::collection::vec(prop_oneof![Just(Decimal::ZERO), price_strategy()], 1..10),
    ) {
        let filter = PriceFilter::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let (pairs, kept) = run_price_filter(&filter, &lasts);
        prop_assert_eq!(kept, pairs);
    }

    /// An enabled price filter drops every pair without a last price
    #[test]
    fn zero_last_is_dropped(
        lasts in prop::collection::vec(prop_oneof![Just(Decimal::ZERO), price_strategy()], 1..10),
        max_price in (1i64..1_000_000i64).prop_map(Decimal::from),
    ) {
        let filter = PriceFilter::new(Decimal::ZERO, Decimal::ZERO, max_price);
        let (pairs, kept) = run_price_filter(&filter, &lasts);
        for (pair, last) in pairs.iter().zip(&lasts) {
            if last.is_zero() {
                prop_assert!(!kept.contains(pair));
            }
        }
        // survivors keep candidate order
        let positions: Vec<usize> = kept.iter().filter_map(|p| pairs.iter().position(|c| c == p)).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
