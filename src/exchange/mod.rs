// 8.0: exchange adapter. wraps one Venue with the capability table, precision
// rounding, retry policy, leverage brackets and the dry-run ledger.
// every remote call goes through the retry layer; only ExchangeError leaves here.

mod core;
mod leverage;
mod ohlcv;
mod orders;
mod settings;

pub use self::core::Exchange;
pub use self::settings::ExchangeSettings;
