// trade-core: exchange abstraction and pair selection for a crypto trading bot.
// risk-first: an order that could breach a limit or a bracket is rejected before
// it reaches the venue. all money math is Decimal.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Side, TradingMode, Collateral, OrderKind, Timestamp
//   2.x  error.rs: ExchangeError taxonomy, fatal vs transient
//   3.x  capabilities.rs: per-venue capability table and venue hooks
//   4.x  venue.rs: the remote Venue trait and VenueError
//   5.x  funding.rs: funding window and fee sums
//   6.x  leverage.rs: leverage bracket table, max leverage, maintenance
//   6.1  liquidation.rs: isolated and cross liquidation price
//   7.x  config.rs: bot config, pairlist chain, presets, validation
//   8.x  exchange/: the adapter: markets, orders, stoploss, leverage, candles
//   9.x  market.rs: market metadata and catalog
//   10.x precision.rs: price/amount rounding, one pip
//   11.x order.rs: order intents, records, dry-run ledger
//   12.x retry.rs: retry policy, backoff, shutdown signal
//   14.x ticker.rs: ticker snapshot and TTL cache
//   15.x scripted.rs: in-memory venue for tests and the simulation
//   16.x snapshot.rs: wholesale-replaced shared state
//   17.x pairlist/: whitelist pipeline and filter stages
//   18.x worker.rs: trading loop driver
//   19.x logging.rs: tracing subscriber setup

// core modules
pub mod error;
pub mod market;
pub mod order;
pub mod precision;
pub mod types;

// venue access
pub mod capabilities;
pub mod exchange;
pub mod retry;
pub mod scripted;
pub mod ticker;
pub mod venue;

// risk math
pub mod funding;
pub mod leverage;
pub mod liquidation;

// pair selection and the loop
pub mod pairlist;
pub mod snapshot;
pub mod worker;

// integration
pub mod config;
pub mod logging;

// re exports for convenience
pub use capabilities::{capabilities_for, ExchangeCapabilities, VenueKind};
pub use config::{BotConfig, ConfigError, PairlistConfig, VolumeSortKey};
pub use error::ExchangeError;
pub use exchange::{Exchange, ExchangeSettings};
pub use leverage::{LeverageBracket, LeverageTiers};
pub use liquidation::{liquidation_price, LiquidationInputs};
pub use market::{Market, MarketCatalog};
pub use order::{DryRunLedger, OrderRecord, OrderRequest, OrderStatus};
pub use pairlist::{PairlistFilter, PairlistManager};
pub use precision::Precision;
pub use retry::{RetryPolicy, Shutdown};
pub use scripted::ScriptedVenue;
pub use snapshot::Snapshot;
pub use ticker::{Ticker, TickerSnapshot};
pub use types::*;
pub use venue::{Candle, FundingRateEntry, Venue, VenueError};
pub use worker::Worker;
