//! Trading core simulation.
//!
//! Runs the exchange adapter and the pairlist pipeline against an in-memory
//! venue: bracket lookups, stoploss placement, liquidation prices, whitelist
//! refreshes and rate-limit recovery.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use trade_core::leverage::RawLeverageBrackets;
use trade_core::logging::init_logging;
use trade_core::scripted::ops;
use trade_core::*;

fn main() -> Result<(), ExchangeError> {
    init_logging("warn");

    println!("Trading Core Simulation");
    println!("Scripted venue, dry-run and live placement\n");

    scenario_1_leverage_brackets()?;
    scenario_2_stoploss_on_exchange()?;
    scenario_3_liquidation_price()?;
    scenario_4_pairlist_chain()?;
    scenario_5_rate_limit_recovery()?;
    scenario_6_worker_loop()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn futures_venue() -> Arc<ScriptedVenue> {
    Arc::new(ScriptedVenue::new("binance").with_markets(vec![
        Market::perpetual("BTC/USDT", dec!(0.1), dec!(0.001)),
        Market::perpetual("ETH/USDT", dec!(0.01), dec!(0.001)),
    ]))
}

fn fast_retry(config: &mut BotConfig) {
    config.retry.backoff_base_ms = 10;
    config.retry.backoff_max_ms = 50;
}

/// Max leverage shrinks as the position grows into higher brackets.
fn scenario_1_leverage_brackets() -> Result<(), ExchangeError> {
    println!("Scenario 1: Leverage Brackets\n");

    let exchange = Exchange::new(&BotConfig::futures_isolated(), futures_venue(), Shutdown::new())?;
    exchange.reload_markets()?;
    let pairs = exchange.fill_leverage_brackets()?;
    println!("  Loaded bundled brackets for {} pairs", pairs);

    for nominal in [dec!(1000), dec!(60000), dec!(300000), dec!(5000000)] {
        println!(
            "  BTC/USDT nominal ${}: max leverage {}x",
            nominal,
            exchange.get_max_leverage("BTC/USDT", nominal).round_dp(2)
        );
    }
    println!("  Unknown pair: max leverage {}x\n", exchange.get_max_leverage("DOGE/USDT", dec!(1000)));
    Ok(())
}

/// Stop-limit orders in dry-run and against the venue.
fn scenario_2_stoploss_on_exchange() -> Result<(), ExchangeError> {
    println!("Scenario 2: Stoploss On Exchange\n");

    let mut config = BotConfig::futures_isolated();
    let exchange = Exchange::new(&config, futures_venue(), Shutdown::new())?;
    exchange.reload_markets()?;
    exchange.fill_leverage_brackets()?;

    let dry = exchange.place_stoploss("ETH/USDT", dec!(0.5), dec!(1800), Side::Sell, dec!(3))?;
    println!(
        "  Dry-run stop {} @ {} limit {}, status {:?}",
        dry.id,
        dry.stop_price.unwrap_or_default(),
        dry.price.unwrap_or_default(),
        dry.status
    );

    config.dry_run = false;
    let mut brackets: RawLeverageBrackets = HashMap::new();
    brackets.insert(
        "ETH/USDT".to_string(),
        vec![[dec!(0), dec!(0.005)], [dec!(10000), dec!(0.0065)]],
    );
    let venue = Arc::new(
        ScriptedVenue::new("binance")
            .with_markets(vec![Market::perpetual("ETH/USDT", dec!(0.01), dec!(0.001))])
            .with_brackets(brackets),
    );
    let live = Exchange::new(&config, venue.clone(), Shutdown::new())?;
    live.reload_markets()?;
    live.fill_leverage_brackets()?;
    let order = live.place_stoploss("ETH/USDT", dec!(0.5), dec!(1800), Side::Sell, dec!(3))?;
    println!("  Live stop accepted as order {}", order.id);
    for (pair, leverage) in venue.leverage_calls() {
        println!("  Venue leverage set: {} {}x", pair, leverage);
    }
    println!(
        "  Raise stop to 1850? {}\n",
        live.stoploss_adjust(dec!(1850), &order, Side::Sell)
    );
    Ok(())
}

/// Isolated liquidation price from the bracket table.
fn scenario_3_liquidation_price() -> Result<(), ExchangeError> {
    println!("Scenario 3: Liquidation Price\n");

    let exchange = Exchange::new(&BotConfig::futures_isolated(), futures_venue(), Shutdown::new())?;
    exchange.fill_leverage_brackets()?;

    for (label, is_short) in [("long", false), ("short", true)] {
        let inputs = exchange.isolated_liquidation_inputs("BTC/USDT", dec!(50000), dec!(1), is_short, dec!(10000))?;
        let price = exchange.liquidation_price("BTC/USDT", &inputs)?;
        println!(
            "  1 BTC {} @ $50,000 with $10,000 margin: liquidation at ${}",
            label,
            price.map(|p| p.round_dp(2)).unwrap_or_default()
        );
    }

    let spot = Exchange::new(&BotConfig::default(), futures_venue(), Shutdown::new())?;
    let none = spot.liquidation_price("BTC/USDT", &LiquidationInputs::default())?;
    println!("  Spot: liquidation price {:?}\n", none);
    Ok(())
}

/// Volume ranking followed by a price floor.
fn scenario_4_pairlist_chain() -> Result<(), ExchangeError> {
    println!("Scenario 4: Pairlist Chain\n");

    let mut config = BotConfig::default();
    config.pairlists = vec![
        PairlistConfig::VolumePairList {
            number_assets: 2,
            sort_key: VolumeSortKey::QuoteVolume,
        },
        PairlistConfig::PriceFilter {
            low_price_ratio: Decimal::ZERO,
            min_price: dec!(0.001),
            max_price: Decimal::ZERO,
        },
    ];

    let venue = Arc::new(
        ScriptedVenue::new("binance")
            .with_markets(vec![
                Market::spot("A/USDT", 6, 0),
                Market::spot("B/USDT", 4, 2),
                Market::spot("C/USDT", 4, 2),
            ])
            .with_tickers(vec![
                Ticker::new("A/USDT").with_last(dec!(0.0005)).with_quote_volume(dec!(100)),
                Ticker::new("B/USDT").with_last(dec!(1)).with_quote_volume(dec!(50)),
                Ticker::new("C/USDT").with_last(dec!(2)).with_quote_volume(dec!(10)),
            ]),
    );
    let exchange = Arc::new(Exchange::new(&config, venue, Shutdown::new())?);
    let manager = PairlistManager::from_config(&config, exchange)?;

    for desc in manager.short_descriptions() {
        println!("  {}", desc);
    }
    let whitelist = manager.refresh_whitelist()?;
    println!("  Whitelist: {:?}\n", whitelist);
    Ok(())
}

/// Rate limiting is retried with backoff, order placement is not.
fn scenario_5_rate_limit_recovery() -> Result<(), ExchangeError> {
    println!("Scenario 5: Rate Limit Recovery\n");

    let mut config = BotConfig::default();
    config.dry_run = false;
    fast_retry(&mut config);

    let venue = Arc::new(
        ScriptedVenue::new("binance")
            .with_markets(vec![Market::spot("ETH/USDT", 2, 4)])
            .with_tickers(vec![Ticker::new("ETH/USDT").with_last(dec!(2000))]),
    );
    venue.fail_next(ops::LOAD_MARKETS, VenueError::DDosProtection("429 Too Many Requests".into()));
    venue.fail_next(ops::LOAD_MARKETS, VenueError::Network("connection reset".into()));

    let exchange = Exchange::new(&config, venue.clone(), Shutdown::new())?;
    exchange.reload_markets()?;
    println!("  Markets loaded after {} attempts", venue.calls(ops::LOAD_MARKETS));

    venue.fail_next(ops::CREATE_ORDER, VenueError::Network("timeout".into()));
    match exchange.create_order(OrderRequest::limit("ETH/USDT", Side::Buy, dec!(0.1), dec!(1990))) {
        Ok(order) => println!("  Unexpected fill {}", order.id),
        Err(e) => println!("  Order not retried: {}", e),
    }
    println!("  create_order calls: {}\n", venue.calls(ops::CREATE_ORDER));
    Ok(())
}

/// The loop keeps publishing whitelists until shutdown.
fn scenario_6_worker_loop() -> Result<(), ExchangeError> {
    println!("Scenario 6: Worker Loop\n");

    let mut config = BotConfig::default();
    config.exchange.pair_whitelist = vec!["ETH/USDT".to_string(), "BTC/USDT".to_string()];
    let venue = Arc::new(ScriptedVenue::new("binance").with_markets(vec![
        Market::spot("ETH/USDT", 2, 4),
        Market::spot("BTC/USDT", 2, 5),
    ]));
    let shutdown = Shutdown::new();
    let exchange = Arc::new(Exchange::new(&config, venue, shutdown.clone())?);
    let worker = Arc::new(Worker::new(&config, exchange)?.with_interval(Duration::from_millis(20)));
    let whitelist = worker.pairlists().whitelist_handle();

    let handle = {
        let worker = worker.clone();
        std::thread::spawn(move || worker.run())
    };
    std::thread::sleep(Duration::from_millis(100));
    println!("  Reader sees whitelist {:?}", whitelist.load());
    shutdown.trigger();

    let iterations = match handle.join() {
        Ok(result) => result?,
        Err(_) => return Err(ExchangeError::Operational("worker thread panicked".to_string())),
    };
    println!("  Worker stopped after {} iterations\n", iterations);
    Ok(())
}
