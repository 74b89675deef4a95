//! Leverage brackets.
//!
//! Each futures pair has a ladder of notional brackets. Bigger positions fall
//! into higher brackets with a higher maintenance margin ratio and therefore a
//! lower maximum leverage (`1 / mmr`).
//!
//! The venue only reports `[notional_floor, mmr]` rows. The cumulative
//! maintenance amount used by the liquidation formula is derived here:
//!
//! ```text
//! cum_0 = 0
//! cum_n = floor_n * (mmr_n - mmr_{n-1}) + cum_{n-1}
//! ```

use crate::error::ExchangeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::error;

/// Bracket rows as delivered by the venue or the fixture file.
pub type RawLeverageBrackets = HashMap<String, Vec<[Decimal; 2]>>;

/// Bracket table shipped with the crate, used in dry-run.
pub const BUNDLED_BRACKETS: &str = include_str!("../data/binance_leverage_brackets.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageBracket {
    pub notional_floor: Decimal,
    pub maintenance_margin_ratio: Decimal,
    pub maintenance_amount: Decimal,
}

impl LeverageBracket {
    pub fn max_leverage(&self) -> Decimal {
        Decimal::ONE / self.maintenance_margin_ratio
    }
}

/// Brackets for every pair, ascending by floor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeverageTiers {
    pairs: HashMap<String, Vec<LeverageBracket>>,
}

impl LeverageTiers {
    /// Builds the table from raw rows, deriving the cumulative maintenance
    /// amounts. Floors must start at zero and strictly increase, and every
    /// ratio must be positive.
    pub fn from_raw(raw: &RawLeverageBrackets) -> Result<Self, ExchangeError> {
        let mut pairs = HashMap::with_capacity(raw.len());

        for (pair, rows) in raw {
            let mut brackets: Vec<LeverageBracket> = Vec::with_capacity(rows.len());

            for &[notional_floor, mmr] in rows {
                if mmr <= Decimal::ZERO {
                    return Err(ExchangeError::Configuration(format!(
                        "Leverage bracket for {} has non-positive maintenance ratio {}",
                        pair, mmr
                    )));
                }

                let maintenance_amount = match brackets.last() {
                    None => {
                        if !notional_floor.is_zero() {
                            return Err(ExchangeError::Configuration(format!(
                                "Lowest leverage bracket for {} must start at 0, got {}",
                                pair, notional_floor
                            )));
                        }
                        Decimal::ZERO
                    }
                    Some(prev) => {
                        if notional_floor <= prev.notional_floor {
                            return Err(ExchangeError::Configuration(format!(
                                "Leverage brackets for {} are not strictly increasing at {}",
                                pair, notional_floor
                            )));
                        }
                        notional_floor * (mmr - prev.maintenance_margin_ratio) + prev.maintenance_amount
                    }
                };

                brackets.push(LeverageBracket {
                    notional_floor,
                    maintenance_margin_ratio: mmr,
                    maintenance_amount,
                });
            }

            pairs.insert(pair.clone(), brackets);
        }

        Ok(Self { pairs })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ExchangeError> {
        let raw: RawLeverageBrackets = serde_json::from_str(json).map_err(|e| {
            ExchangeError::Configuration(format!("Could not parse leverage brackets: {}", e))
        })?;
        Self::from_raw(&raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, ExchangeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ExchangeError::Configuration(format!(
                "Could not read leverage brackets from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn bundled() -> Result<Self, ExchangeError> {
        Self::from_json_str(BUNDLED_BRACKETS)
    }

    pub fn brackets(&self, pair: &str) -> Option<&[LeverageBracket]> {
        self.pairs.get(pair).map(Vec::as_slice)
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.pairs.contains_key(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Highest bracket whose floor is at or below `nominal`.
    fn bracket_for(&self, pair: &str, nominal: Decimal) -> Option<&LeverageBracket> {
        self.pairs
            .get(pair)?
            .iter()
            .rev()
            .find(|b| nominal >= b.notional_floor)
    }

    /// Maximum leverage at this notional. 1 when the pair is unknown or the
    /// notional sits below every floor.
    pub fn get_max_leverage(&self, pair: &str, nominal: Decimal) -> Decimal {
        self.bracket_for(pair, nominal)
            .map(LeverageBracket::max_leverage)
            .unwrap_or(Decimal::ONE)
    }

    /// `(maintenance_margin_ratio, maintenance_amount)` for the bracket that
    /// covers `nominal`.
    pub fn get_maintenance_ratio_and_amount(
        &self,
        pair: &str,
        nominal: Decimal,
    ) -> Result<(Decimal, Decimal), ExchangeError> {
        if !self.pairs.contains_key(pair) {
            return Err(ExchangeError::InvalidOrder(format!(
                "Cannot calculate liquidation price for {}",
                pair
            )));
        }
        match self.bracket_for(pair, nominal) {
            Some(b) => Ok((b.maintenance_margin_ratio, b.maintenance_amount)),
            None => {
                error!(pair, %nominal, "no leverage bracket covers nominal value");
                Err(ExchangeError::InvariantViolation(format!(
                    "nominal value {} for {} is below the lowest bracket",
                    nominal, pair
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(rows: &[(&str, Vec<[Decimal; 2]>)]) -> RawLeverageBrackets {
        rows.iter().map(|(p, r)| (p.to_string(), r.clone())).collect()
    }

    fn btc_tiers() -> LeverageTiers {
        LeverageTiers::from_raw(&raw(&[(
            "BTC/USDT",
            vec![
                [dec!(0), dec!(0.004)],
                [dec!(50000), dec!(0.005)],
                [dec!(250000), dec!(0.01)],
                [dec!(1000000), dec!(0.025)],
            ],
        )]))
        .unwrap()
    }

    #[test]
    fn cumulative_amount_is_incremental() {
        let tiers = btc_tiers();
        let amounts: Vec<Decimal> = tiers
            .brackets("BTC/USDT")
            .unwrap()
            .iter()
            .map(|b| b.maintenance_amount)
            .collect();
        // 50000 * 0.001 = 50; 250000 * 0.005 + 50 = 1300; 1000000 * 0.015 + 1300 = 16300
        assert_eq!(amounts, vec![dec!(0), dec!(50), dec!(1300), dec!(16300)]);
    }

    #[test]
    fn max_leverage_walks_from_the_top() {
        let tiers = btc_tiers();
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(0)), dec!(250));
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(49999)), dec!(250));
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(50000)), dec!(200));
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(300000)), dec!(100));
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(5000000)), dec!(40));
    }

    #[test]
    fn unknown_pair_has_leverage_one() {
        let tiers = LeverageTiers::default();
        assert_eq!(tiers.get_max_leverage("XRP/USDT", dec!(0)), Decimal::ONE);
        assert_eq!(btc_tiers().get_max_leverage("XRP/USDT", dec!(1000)), Decimal::ONE);
    }

    #[test]
    fn negative_nominal_falls_below_every_floor() {
        let tiers = btc_tiers();
        assert_eq!(tiers.get_max_leverage("BTC/USDT", dec!(-1)), Decimal::ONE);
        let err = tiers
            .get_maintenance_ratio_and_amount("BTC/USDT", dec!(-1))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvariantViolation(_)));
    }

    #[test]
    fn maintenance_ratio_and_amount() {
        let tiers = btc_tiers();
        assert_eq!(
            tiers.get_maintenance_ratio_and_amount("BTC/USDT", dec!(300000)).unwrap(),
            (dec!(0.01), dec!(1300))
        );
        assert_eq!(
            tiers.get_maintenance_ratio_and_amount("BTC/USDT", dec!(10)).unwrap(),
            (dec!(0.004), dec!(0))
        );
        let err = tiers
            .get_maintenance_ratio_and_amount("DOGE/USDT", dec!(10))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidOrder(msg) if msg.contains("DOGE/USDT")));
    }

    #[test]
    fn rejects_malformed_ladders() {
        let not_from_zero = raw(&[("A/USDT", vec![[dec!(10), dec!(0.01)]])]);
        assert!(matches!(
            LeverageTiers::from_raw(&not_from_zero),
            Err(ExchangeError::Configuration(_))
        ));

        let not_increasing = raw(&[(
            "A/USDT",
            vec![[dec!(0), dec!(0.01)], [dec!(0), dec!(0.02)]],
        )]);
        assert!(LeverageTiers::from_raw(&not_increasing).is_err());

        let zero_ratio = raw(&[("A/USDT", vec![[dec!(0), dec!(0)]])]);
        assert!(LeverageTiers::from_raw(&zero_ratio).is_err());
    }

    #[test]
    fn bundled_fixture_parses() {
        let tiers = LeverageTiers::bundled().unwrap();
        assert!(!tiers.is_empty());
        let btc = tiers.brackets("BTC/USDT").unwrap();
        assert_eq!(btc[0].notional_floor, Decimal::ZERO);
        assert_eq!(btc[0].maintenance_amount, Decimal::ZERO);
        assert!(btc.windows(2).all(|w| w[0].notional_floor < w[1].notional_floor));
    }
}
