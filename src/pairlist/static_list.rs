// 17.1: configured whitelist. keeps the configured order, drops pairs the
// venue does not list (or lists as inactive) and blacklisted ones.

use super::{FilterContext, PairlistFilter};
use crate::error::ExchangeError;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct StaticPairList {
    pairs: Vec<String>,
}

impl StaticPairList {
    pub fn new(pairs: Vec<String>) -> Self {
        Self { pairs }
    }
}

impl PairlistFilter for StaticPairList {
    fn name(&self) -> &'static str {
        "StaticPairList"
    }

    fn needs_tickers(&self) -> bool {
        false
    }

    fn short_desc(&self) -> String {
        format!("{} - {} configured pairs.", self.name(), self.pairs.len())
    }

    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError> {
        let candidates: HashSet<&str> = pairs.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut whitelist = Vec::with_capacity(self.pairs.len());

        for pair in &self.pairs {
            if !candidates.contains(pair.as_str()) {
                ctx.log.info(format!(
                    "Pair {} is not compatible with exchange {} or is blacklisted, removing it from whitelist.",
                    pair,
                    ctx.exchange.id()
                ));
                continue;
            }
            if seen.insert(pair.as_str()) {
                whitelist.push(pair.clone());
            }
        }
        Ok(whitelist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use crate::pairlist::testing::{exchange, pairs, venue};
    use crate::pairlist::LogOnce;

    #[test]
    fn keeps_configured_order_and_drops_unknown() {
        let exchange = exchange(venue(vec![Market::spot("ETH/USDT", 2, 4)], vec![]));
        let log = LogOnce::new();
        let ctx = FilterContext {
            exchange: &exchange,
            tickers: None,
            log: &log,
        };

        let stage = StaticPairList::new(pairs(&["XRP/USDT", "ETH/USDT", "BTC/USDT", "ETH/USDT"]));
        let result = stage
            .filter_pairlist(pairs(&["BTC/USDT", "ETH/USDT", "LTC/USDT"]), &ctx)
            .unwrap();
        assert_eq!(result, pairs(&["ETH/USDT", "BTC/USDT"]));
        assert!(!stage.needs_tickers());
    }
}
