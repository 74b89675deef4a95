//! Liquidation price.
//!
//! Isolated and cross futures use the venue's maintenance-margin formula:
//!
//! ```text
//!         WB + (UPNL_others - MM_others) + CUM - side * POS * EP
//! LP = ---------------------------------------------------------
//!                    POS * MMR - side * POS
//! ```
//!
//! with `side = +1` for longs and `-1` for shorts. The cross adjustment is
//! zero for isolated positions. Spot positions cannot be liquidated.

use crate::error::ExchangeError;
use crate::types::{Collateral, TradingMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything the formula may need. Which fields are required depends on
/// the collateral mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidationInputs {
    /// Entry price of the position.
    pub open_rate: Decimal,
    pub is_short: bool,
    /// Position size in base currency. Sign is ignored.
    pub position: Option<Decimal>,
    pub wallet_balance: Option<Decimal>,
    /// Cumulative maintenance amount of the position's bracket.
    pub maintenance_amount: Option<Decimal>,
    pub mm_ratio: Decimal,
    /// Cross only: maintenance margin of every other position.
    pub other_positions_margin: Option<Decimal>,
    /// Cross only: unrealized PnL of every other position.
    pub other_positions_unrealized_pnl: Option<Decimal>,
}

fn missing_fields(inputs: &LiquidationInputs, collateral: Collateral) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if inputs.wallet_balance.is_none() {
        missing.push("wallet_balance");
    }
    if inputs.maintenance_amount.is_none() {
        missing.push("maintenance_amount");
    }
    if inputs.position.is_none() {
        missing.push("position");
    }
    if collateral == Collateral::Cross {
        if inputs.other_positions_margin.is_none() {
            missing.push("other_positions_margin");
        }
        if inputs.other_positions_unrealized_pnl.is_none() {
            missing.push("other_positions_unrealized_pnl");
        }
    }
    missing
}

/// Liquidation price for `pair`, or `None` in spot mode.
pub fn liquidation_price(
    pair: &str,
    trading_mode: TradingMode,
    collateral: Option<Collateral>,
    inputs: &LiquidationInputs,
) -> Result<Option<Decimal>, ExchangeError> {
    if trading_mode == TradingMode::Spot {
        return Ok(None);
    }

    let collateral = collateral.ok_or_else(|| {
        ExchangeError::Configuration(format!(
            "Collateral is required to compute the liquidation price of {} in {} mode",
            pair, trading_mode
        ))
    })?;

    let missing = missing_fields(inputs, collateral);
    if !missing.is_empty() {
        return Err(ExchangeError::Configuration(format!(
            "Parameters {} are required for {} {} liquidation price of {}",
            missing.join(", "),
            collateral,
            trading_mode,
            pair
        )));
    }

    if trading_mode != TradingMode::Futures {
        return Err(ExchangeError::Configuration(format!(
            "{} {} trading is not supported for {}",
            collateral, trading_mode, pair
        )));
    }

    // all present, checked above
    let wallet_balance = inputs.wallet_balance.unwrap_or_default();
    let maintenance_amount = inputs.maintenance_amount.unwrap_or_default();
    let position = inputs.position.unwrap_or_default().abs();

    let cross_adjustment = match collateral {
        Collateral::Cross => {
            inputs.other_positions_unrealized_pnl.unwrap_or_default()
                - inputs.other_positions_margin.unwrap_or_default()
        }
        Collateral::Isolated => Decimal::ZERO,
    };

    let side = if inputs.is_short { Decimal::NEGATIVE_ONE } else { Decimal::ONE };

    let numerator = wallet_balance + cross_adjustment + maintenance_amount - side * position * inputs.open_rate;
    let denominator = position * inputs.mm_ratio - side * position;

    if denominator.is_zero() {
        return Err(ExchangeError::Configuration(format!(
            "Cannot compute liquidation price of {} for an empty position",
            pair
        )));
    }

    Ok(Some(numerator / denominator))
}
