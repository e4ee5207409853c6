use core_types::StrategyVariant;
use serde::Deserialize;

/// Parameters of the bias strategy and of the grid search that tunes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub variant: StrategyVariant,
    /// Short MA used for the sell bias (MA5).
    pub short_ma_window: usize,
    /// Long MA used for the buy bias (MA60).
    pub long_ma_window: usize,
    pub rsi_period: usize,
    /// RSI must be below this for a buy in the RSI variant.
    pub rsi_buy_ceiling: f64,
    /// RSI above this allows the early exit in the RSI variant.
    pub rsi_exit_floor: f64,
    /// Fraction of the sell threshold at which the early exit may fire.
    pub early_exit_ratio: f64,
    /// Commission charged on both legs (0.002 = 0.2%).
    pub commission: f64,
    pub initial_capital: f64,
    /// Cells with fewer completed trades are discarded.
    pub min_trades: u32,
    /// Stocks with fewer valid bars are not optimized.
    pub min_history_bars: usize,
    /// Buy threshold grid, as a fraction of the long MA.
    pub buy_range: GridRange,
    /// Sell threshold grid, as a fraction of the short MA.
    pub sell_range: GridRange,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            variant: StrategyVariant::RsiFiltered,
            short_ma_window: 5,
            long_ma_window: 60,
            rsi_period: 14,
            rsi_buy_ceiling: 40.0,
            rsi_exit_floor: 75.0,
            early_exit_ratio: 0.8,
            commission: 0.002,
            initial_capital: 100_000.0,
            min_trades: 3,
            min_history_bars: 100,
            buy_range: GridRange {
                start: -0.10,
                end: 0.10,
                step: 0.002,
            },
            sell_range: GridRange {
                start: 0.0,
                end: 0.15,
                step: 0.002,
            },
        }
    }
}

/// A closed interval sampled at a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GridRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl GridRange {
    /// Number of grid points, end inclusive (with a small tolerance for float steps).
    pub fn len(&self) -> usize {
        if !self.is_well_formed() {
            return 0;
        }
        ((self.end - self.start) / self.step + 1e-9).floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The grid points in ascending order. Each is computed as `start + i * step`
    /// so accumulated float error does not drift along the axis.
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }

    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && self.step.is_finite()
            && self.step > 0.0
            && self.start <= self.end
    }
}
