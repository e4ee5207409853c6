//! # Strategy Backtester
//!
//! A single-position, long-only bias strategy simulated over pre-materialized arrays.
//! The grid optimizer calls [`run`] thousands of times per stock, so the loop is O(n)
//! with no allocation.

use configuration::StrategyConfig;

pub mod error;
pub mod inputs;

pub use error::BacktestError;
pub use inputs::BacktestInputs;

/// RSI conditions of the filtered strategy variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiRule {
    /// Entries need RSI strictly below this.
    pub buy_ceiling: f64,
    /// Early exit needs RSI strictly above this.
    pub exit_floor: f64,
    /// Early exit fires at this fraction of the sell threshold.
    pub early_exit_ratio: f64,
}

/// Costs and capital of one simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSettings {
    pub commission: f64,
    pub initial_capital: f64,
    /// `None` runs the plain bias strategy.
    pub rsi: Option<RsiRule>,
}

impl KernelSettings {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            commission: config.commission,
            initial_capital: config.initial_capital,
            rsi: config.variant.uses_rsi().then_some(RsiRule {
                buy_ceiling: config.rsi_buy_ceiling,
                exit_floor: config.rsi_exit_floor,
                early_exit_ratio: config.early_exit_ratio,
            }),
        }
    }
}

/// Result of one (buy, sell) threshold pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestOutcome {
    pub total_return_pct: f64,
    /// Completed round trips. An open position at the end is not counted.
    pub trade_count: u32,
    pub win_count: u32,
}

impl BacktestOutcome {
    pub fn win_rate_pct(&self) -> f64 {
        if self.trade_count == 0 {
            0.0
        } else {
            f64::from(self.win_count) / f64::from(self.trade_count) * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    Flat,
    Long { shares: f64, entry_price: f64 },
}

/// Simulates the strategy for one threshold pair.
///
/// * FLAT -> LONG when `long_bias <= buy_threshold` (and, with an [`RsiRule`], RSI below its
///   ceiling). All capital is spent, commission included.
/// * LONG -> FLAT when `short_bias >= sell_threshold`, or with an [`RsiRule`] when
///   `short_bias >= sell_threshold * early_exit_ratio` and RSI is above the exit floor.
///   A trade is a win when net proceeds exceed the entry cost basis (shares x entry price).
/// * Bars with a non-positive close are skipped.
/// * An open position is marked to market at the last valid close, net of commission.
///
/// An RSI rule is ignored when `inputs` carry no RSI column.
pub fn run(
    inputs: &BacktestInputs,
    buy_threshold: f64,
    sell_threshold: f64,
    settings: &KernelSettings,
) -> BacktestOutcome {
    let close = inputs.close();
    let short_bias = inputs.short_bias();
    let long_bias = inputs.long_bias();
    let rsi = inputs.rsi();
    let rule = settings.rsi.filter(|_| rsi.is_some());
    let fee = settings.commission;

    let mut capital = settings.initial_capital;
    let mut position = Position::Flat;
    let mut last_price: Option<f64> = None;
    let mut trade_count = 0u32;
    let mut win_count = 0u32;

    for i in 0..close.len() {
        let price = close[i];
        if !(price > 0.0) {
            continue;
        }
        last_price = Some(price);
        let rsi_now = rsi.map_or(f64::NAN, |r| r[i]);

        match position {
            Position::Long {
                shares,
                entry_price,
            } => {
                let cost_basis = shares * entry_price;
                if !(cost_basis > 0.0 && cost_basis.is_finite()) {
                    // Corrupt position: drop it rather than divide by nonsense.
                    capital = 0.0;
                    position = Position::Flat;
                    continue;
                }

                let take_profit = short_bias[i] >= sell_threshold;
                let early_exit = rule.is_some_and(|r| {
                    short_bias[i] >= sell_threshold * r.early_exit_ratio && rsi_now > r.exit_floor
                });

                if take_profit || early_exit {
                    let proceeds = shares * price * (1.0 - fee);
                    trade_count += 1;
                    if proceeds > cost_basis {
                        win_count += 1;
                    }
                    capital = proceeds;
                    position = Position::Flat;
                }
            }
            Position::Flat => {
                let oversold = long_bias[i] <= buy_threshold;
                let rsi_ok = rule.is_none_or(|r| rsi_now < r.buy_ceiling);
                if oversold && rsi_ok {
                    position = Position::Long {
                        shares: capital / (price * (1.0 + fee)),
                        entry_price: price,
                    };
                }
            }
        }
    }

    let final_value = match (position, last_price) {
        (Position::Long { shares, .. }, Some(price)) => shares * price * (1.0 - fee),
        _ => capital,
    };

    BacktestOutcome {
        total_return_pct: (final_value - settings.initial_capital) / settings.initial_capital
            * 100.0,
        trade_count,
        win_count,
    }
}
