use crate::error::OptimizerError;
use crate::generator::{GridCell, generate_grid};
use backtester::{BacktestInputs, BacktestOutcome, KernelSettings};
use classifier::window_start;
use configuration::StrategyConfig;
use core_types::{PriceSeries, StrategyParams, round_decimal};
use indicators::{FrameSpec, IndicatorFrame};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Closes at or below this are treated as missing prices.
pub const MIN_PRICE: f64 = 0.0001;

/// Everything one stock's grid search needs. Self-contained so it can move to a worker.
#[derive(Debug, Clone)]
pub struct OptimizationJob {
    pub code: String,
    /// Length of the verdict's calendar window.
    pub period_years: u32,
    pub series: PriceSeries,
}

/// The kernel inputs of one stock's window plus its buy-and-hold benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWindow {
    pub inputs: BacktestInputs,
    pub benchmark_return_pct: f64,
}

/// Best cell of a search together with its backtest outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub cell: GridCell,
    pub outcome: BacktestOutcome,
}

/// Exhaustive grid search over (buy, sell) bias thresholds for a single stock.
#[derive(Debug, Clone)]
pub struct GridOptimizer {
    config: StrategyConfig,
    grid: Vec<GridCell>,
    settings: KernelSettings,
}

impl GridOptimizer {
    pub fn new(config: StrategyConfig) -> Result<Self, OptimizerError> {
        let grid = generate_grid(&config)?;
        let settings = KernelSettings::from_config(&config);
        Ok(Self {
            config,
            grid,
            settings,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn grid(&self) -> &[GridCell] {
        &self.grid
    }

    /// Computes indicators over the full history, then cuts the trailing `period_years`
    /// window. `Ok(None)` when the stock has too little data to optimize.
    pub fn prepare(
        &self,
        series: &PriceSeries,
        period_years: u32,
    ) -> Result<Option<PreparedWindow>, OptimizerError> {
        let points: Vec<_> = series
            .points()
            .iter()
            .filter(|p| p.close > MIN_PRICE)
            .collect();
        if points.len() < self.config.min_history_bars {
            return Ok(None);
        }
        let Some(latest) = points.last().map(|p| p.date) else {
            return Ok(None);
        };

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let frame = IndicatorFrame::compute(
            &closes,
            FrameSpec {
                short_window: self.config.short_ma_window,
                long_window: self.config.long_ma_window,
                rsi_period: self
                    .config
                    .variant
                    .uses_rsi()
                    .then_some(self.config.rsi_period),
            },
        )?;

        let target_start = window_start(latest, period_years);
        let start = points.partition_point(|p| p.date < target_start);
        if start >= points.len() {
            return Ok(None);
        }

        let benchmark_cost = if start > 0 {
            points[start - 1].close
        } else {
            points[start].open
        };

        let inputs = BacktestInputs::from_frame(&frame, start);
        let Some(&last_close) = inputs.close().last() else {
            return Ok(None);
        };
        let benchmark_return_pct = if benchmark_cost > MIN_PRICE {
            (last_close - benchmark_cost) / benchmark_cost * 100.0
        } else {
            0.0
        };

        Ok(Some(PreparedWindow {
            inputs,
            benchmark_return_pct,
        }))
    }

    /// Runs every grid cell and keeps the strictly best total return among cells with at
    /// least `min_trades` trades. `cancel` is polled before every cell.
    pub fn search(
        &self,
        inputs: &BacktestInputs,
        cancel: &CancellationToken,
    ) -> Result<Option<SearchResult>, OptimizerError> {
        let mut best: Option<SearchResult> = None;

        for &cell in &self.grid {
            if cancel.is_cancelled() {
                return Err(OptimizerError::Interrupted);
            }
            let outcome = backtester::run(inputs, cell.buy, cell.sell, &self.settings);
            if outcome.trade_count < self.config.min_trades {
                continue;
            }
            if best.is_none_or(|b| outcome.total_return_pct > b.outcome.total_return_pct) {
                best = Some(SearchResult { cell, outcome });
            }
        }
        Ok(best)
    }

    /// Finds the best thresholds for one stock. `Ok(None)` means no result: too little data
    /// or no cell reached the minimum trade count.
    pub fn optimize(
        &self,
        job: &OptimizationJob,
        cancel: &CancellationToken,
    ) -> Result<Option<StrategyParams>, OptimizerError> {
        let Some(window) = self.prepare(&job.series, job.period_years)? else {
            debug!(code = %job.code, "Not enough history to optimize");
            return Ok(None);
        };

        let Some(best) = self.search(&window.inputs, cancel)? else {
            debug!(code = %job.code, cells = self.grid.len(), "No cell reached the minimum trade count");
            return Ok(None);
        };

        debug!(
            code = %job.code,
            buy = best.cell.buy,
            sell = best.cell.sell,
            total_return = best.outcome.total_return_pct,
            trades = best.outcome.trade_count,
            "Best cell found"
        );

        Ok(Some(StrategyParams {
            variant: self.config.variant,
            period_years: job.period_years,
            buy_bias_threshold_pct: round_decimal(best.cell.buy * 100.0, 1),
            sell_bias_threshold_pct: round_decimal(best.cell.sell * 100.0, 1),
            total_return_pct: round_decimal(best.outcome.total_return_pct, 2),
            benchmark_return_pct: round_decimal(window.benchmark_return_pct, 2),
            win_rate_pct: round_decimal(best.outcome.win_rate_pct(), 1),
            trade_count: best.outcome.trade_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use configuration::GridRange;
    use core_types::{PricePoint, StrategyVariant};

    fn optimizer(buy: GridRange, sell: GridRange) -> GridOptimizer {
        GridOptimizer::new(StrategyConfig {
            variant: StrategyVariant::Plain,
            buy_range: buy,
            sell_range: sell,
            ..StrategyConfig::default()
        })
        .unwrap()
    }

    /// Three identical round trips: buy days carry long bias -0.10, sell days short bias 0.10.
    fn three_round_trips() -> BacktestInputs {
        let mut close = Vec::new();
        let mut short = Vec::new();
        let mut long = Vec::new();
        for _ in 0..3 {
            close.extend([10.0, 11.0]);
            long.extend([-0.10, 0.5]);
            short.extend([-0.5, 0.10]);
        }
        BacktestInputs::new(close, short, long, None).unwrap()
    }

    #[test]
    fn identical_returns_keep_the_first_cell() {
        let opt = optimizer(
            GridRange {
                start: -0.10,
                end: 0.0,
                step: 0.05,
            },
            GridRange {
                start: 0.0,
                end: 0.10,
                step: 0.05,
            },
        );
        let best = opt
            .search(&three_round_trips(), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(best.cell, GridCell { buy: -0.10, sell: 0.0 });
        assert_eq!(best.outcome.trade_count, 3);
        assert_eq!(best.outcome.win_count, 3);
    }

    #[test]
    fn no_cell_with_enough_trades_is_no_result() {
        // Buy thresholds far below any bias in the data: nothing ever trades.
        let opt = optimizer(
            GridRange {
                start: -0.50,
                end: -0.40,
                step: 0.05,
            },
            GridRange {
                start: 0.0,
                end: 0.10,
                step: 0.05,
            },
        );
        assert_eq!(
            opt.search(&three_round_trips(), &CancellationToken::new()).unwrap(),
            None
        );
    }

    #[test]
    fn cancelled_search_is_interrupted() {
        let opt = GridOptimizer::new(StrategyConfig::default()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            opt.search(&three_round_trips(), &token),
            Err(OptimizerError::Interrupted)
        ));
    }

    /// One bar per calendar day: a 40-day, 10% sine cycle on a gentle uptrend.
    fn oscillating(days: i64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let points = (0..days)
            .map(|i| {
                let t = i as f64;
                let close = 10.0
                    * (1.0 + 0.1 * (2.0 * std::f64::consts::PI * t / 40.0).sin())
                    * (0.1 * t / 365.25).exp();
                PricePoint {
                    date: start + Duration::days(i),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect();
        PriceSeries::new("00011", points)
    }

    #[test]
    fn optimize_is_deterministic_and_rounds_outputs() {
        let opt = GridOptimizer::new(StrategyConfig {
            variant: StrategyVariant::Plain,
            ..StrategyConfig::default()
        })
        .unwrap();
        let job = OptimizationJob {
            code: "00011".to_string(),
            period_years: 1,
            series: oscillating(600),
        };
        let token = CancellationToken::new();

        let first = opt.optimize(&job, &token).unwrap().expect("oscillation trades often");
        let second = opt.optimize(&job, &token).unwrap().expect("same input");
        assert_eq!(first, second);
        assert!(first.trade_count >= 3);
        assert_eq!(first.period_years, 1);
        assert_eq!(first.buy_bias_threshold_pct, first.buy_bias_threshold_pct.round_dp(1));
        assert_eq!(first.total_return_pct, first.total_return_pct.round_dp(2));
    }

    #[test]
    fn short_history_is_not_optimized() {
        let opt = GridOptimizer::new(StrategyConfig::default()).unwrap();
        let job = OptimizationJob {
            code: "00011".to_string(),
            period_years: 1,
            series: oscillating(99),
        };
        assert_eq!(opt.optimize(&job, &CancellationToken::new()).unwrap(), None);
    }

    #[test]
    fn benchmark_uses_the_close_before_the_window() {
        let opt = GridOptimizer::new(StrategyConfig {
            variant: StrategyVariant::Plain,
            ..StrategyConfig::default()
        })
        .unwrap();
        let series = oscillating(600);
        let window = opt.prepare(&series, 1).unwrap().unwrap();

        let latest = series.latest().unwrap();
        let start = series
            .index_on_or_after(window_start(latest.date, 1))
            .unwrap();
        let cost = series.points()[start - 1].close;
        let expected = (latest.close - cost) / cost * 100.0;
        assert!((window.benchmark_return_pct - expected).abs() < 1e-9);
    }
}
