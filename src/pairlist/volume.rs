// 17.2: top N pairs by 24h volume, highest first.

use super::{FilterContext, PairlistFilter};
use crate::config::VolumeSortKey;
use crate::error::ExchangeError;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct VolumePairList {
    number_assets: usize,
    sort_key: VolumeSortKey,
}

impl VolumePairList {
    pub fn new(number_assets: usize, sort_key: VolumeSortKey) -> Self {
        Self {
            number_assets,
            sort_key,
        }
    }
}

impl PairlistFilter for VolumePairList {
    fn name(&self) -> &'static str {
        "VolumePairList"
    }

    fn needs_tickers(&self) -> bool {
        true
    }

    fn short_desc(&self) -> String {
        format!("{} - top {} volume pairs.", self.name(), self.number_assets)
    }

    fn filter_pairlist(&self, pairs: Vec<String>, ctx: &FilterContext<'_>) -> Result<Vec<String>, ExchangeError> {
        let mut ranked: Vec<(String, Decimal)> = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let volume = ctx.ticker(&pair).and_then(|t| match self.sort_key {
                VolumeSortKey::QuoteVolume => t.quote_volume,
                VolumeSortKey::BaseVolume => t.base_volume,
            });
            match volume {
                Some(volume) => ranked.push((pair, volume)),
                None => {
                    ctx.log.info(format!("Removed {} from whitelist, because it has no volume data.", pair));
                }
            }
        }

        // stable: equal volumes keep candidate order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.number_assets);
        Ok(ranked.into_iter().map(|(pair, _)| pair).collect())
    }
}
