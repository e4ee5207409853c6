use crate::enums::StrategyVariant;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

/// The optimized bias thresholds for one stock, with the backtest figures that selected them.
///
/// Thresholds and rates are percentages. Only produced when a grid cell met the minimum trade
/// count, so every instance describes a real result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub variant: StrategyVariant,
    /// The trend window (in years) the backtest ran over.
    pub period_years: u32,
    /// Buy when `(close - long MA) / long MA` is at or below this, in percent (1 dp).
    pub buy_bias_threshold_pct: Decimal,
    /// Sell when `(close - short MA) / short MA` is at or above this, in percent (1 dp).
    pub sell_bias_threshold_pct: Decimal,
    pub total_return_pct: Decimal,
    pub benchmark_return_pct: Decimal,
    pub win_rate_pct: Decimal,
    pub trade_count: u32,
}

impl StrategyParams {
    pub fn buy_threshold_pct(&self) -> f64 {
        self.buy_bias_threshold_pct.to_f64().unwrap_or_default()
    }

    pub fn sell_threshold_pct(&self) -> f64 {
        self.sell_bias_threshold_pct.to_f64().unwrap_or_default()
    }
}

/// Rounds an `f64` to `dp` decimal places as a `Decimal`. Non-finite input maps to zero.
pub fn round_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounding_to_fixed_places() {
        assert_eq!(round_decimal(-4.6000000000000005, 1), dec!(-4.6));
        assert_eq!(round_decimal(12.3456, 2), dec!(12.35));
        assert_eq!(round_decimal(f64::NAN, 2), Decimal::ZERO);
    }

    #[test]
    fn threshold_accessors_return_percent_floats() {
        let params = StrategyParams {
            variant: StrategyVariant::Plain,
            period_years: 3,
            buy_bias_threshold_pct: dec!(-5.2),
            sell_bias_threshold_pct: dec!(3.0),
            total_return_pct: dec!(80.12),
            benchmark_return_pct: dec!(60.00),
            win_rate_pct: dec!(75.0),
            trade_count: 4,
        };
        assert_eq!(params.buy_threshold_pct(), -5.2);
        assert_eq!(params.sell_threshold_pct(), 3.0);
    }
}
