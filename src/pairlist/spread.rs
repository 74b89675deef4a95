// 17.4: drops pairs whose order book spread is too wide.

use super::{FilterContext, PairlistFilter};
use crate::error::ExchangeError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct SpreadFilter {
    max_spread_ratio: Decimal,
}

impl SpreadFilter {
    pub fn new(max_spread_ratio: Decimal) -> Self {
        Self { max_spread_ratio }
    }

    /// `1 - bid/ask`, or None when the book side is missing.
    pub fn spread(bid: Option<Decimal>, ask: Option<Decimal>) -> Option<Decimal> {
        match (bid, ask) {
            (Some(bid), Some(ask)) if !ask.is_zero() => Some(Decimal::ONE - bid / ask),
            _ => None,
        }
    }
}

impl PairlistFilter for SpreadFilter {
    fn name(&self) -> &'static str {
        "SpreadFilter"
    }

    fn needs_tickers(&self) -> bool {
        true
    }

    fn short_desc(&self) -> String {
        format!(
            "{} - Filtering pairs with ask/bid diff above {}%.",
            self.name(),
            (self.max_spread_ratio * dec!(100)).normalize()
        )
    }

    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError> {
        let kept = pairs
            .into_iter()
            .filter(|pair| {
                let spread = ctx.ticker(pair).and_then(|t| Self::spread(t.bid, t.ask));
                match spread {
                    Some(spread) if spread <= self.max_spread_ratio => true,
                    Some(spread) => {
                        ctx.log.info(format!(
                            "Removed {} from whitelist, because spread {:.3}% > {}%",
                            pair,
                            spread * dec!(100),
                            (self.max_spread_ratio * dec!(100)).normalize()
                        ));
                        false
                    }
                    None => {
                        ctx.log.info(format!(
                            "Removed {} from whitelist due to invalid ticker data: no bid/ask",
                            pair
                        ));
                        false
                    }
                }
            })
            .collect();
        Ok(kept)
    }
}
