use crate::error::ConfigError;
use crate::optimizer_config::StrategyConfig;
use serde::Deserialize;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its `Default`, so a missing or partial `config.toml`
/// still produces a complete configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trend: TrendConfig,
    pub strategy: StrategyConfig,
    pub signal: SignalConfig,
    pub workers: WorkerConfig,
    pub batch: BatchConfig,
    pub notifier: NotifierConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Thresholds of the long-bull trend classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Minimum goodness of fit of the log-linear regression.
    pub min_r_squared: f64,
    pub min_annual_return_pct: f64,
    pub max_annual_return_pct: f64,
    /// Minimum mean daily close x volume over the window, in HKD.
    pub min_turnover: f64,
    /// Minimum total market capitalisation, in HKD.
    pub min_market_cap: f64,
    /// Short MA of the trend-break circuit breaker (MA50).
    pub short_ma_window: usize,
    /// Long MA for the breaker and the interruption check (MA250).
    pub long_ma_window: usize,
    /// The breaker only runs on series longer than this many bars.
    pub trend_break_check_days: usize,
    /// The long MA is compared against its value this many positions from the end.
    pub trend_break_lookback: usize,
    pub min_regression_samples: usize,
    /// A run of this many consecutive closes below the long MA fails the window.
    pub max_interruption_days: usize,
    /// A window whose first bar is later than this many days after the target start fails.
    pub max_coverage_gap_days: i64,
    /// Candidate windows in years, tried in the given order.
    pub window_years: Vec<u32>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_r_squared: 0.80,
            min_annual_return_pct: 10.0,
            max_annual_return_pct: 150.0,
            min_turnover: 50_000_000.0,
            min_market_cap: 10_000_000_000.0,
            short_ma_window: 50,
            long_ma_window: 250,
            trend_break_check_days: 270,
            trend_break_lookback: 20,
            min_regression_samples: 20,
            max_interruption_days: 5,
            max_coverage_gap_days: 30,
            window_years: vec![5, 4, 3, 2, 1],
        }
    }
}

/// Settings for the live signal check.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Trailing bars loaded per stock.
    pub history_bars: usize,
    /// "Near" means within this fraction of the threshold's magnitude (0.2 = 20%).
    pub approach_buffer: f64,
    /// Latest bar older than this many calendar days means stale data.
    pub max_staleness_days: i64,
    pub report_duration: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            history_bars: 100,
            approach_buffer: 0.2,
            max_staleness_days: 5,
            report_duration: true,
        }
    }
}

/// Bounds of the optimizer's worker pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Upper bound on worker threads; the pool uses min(CPU count, this).
    pub max_workers: usize,
    /// Hard limit on one stock's grid search.
    pub task_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            task_timeout_secs: 120,
        }
    }
}

/// Pacing and universe filters of the batch drivers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Stock codes starting with any of these are skipped (RMB counters).
    pub excluded_prefixes: Vec<String>,
    /// Pause after every this many stocks during classification.
    pub yield_every: usize,
    pub yield_pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["8".to_string()],
            yield_every: 20,
            yield_pause_ms: 100,
        }
    }
}

impl BatchConfig {
    pub fn is_excluded(&self, code: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && code.starts_with(prefix.as_str()))
    }
}

/// The DingTalk group-robot webhook used for signal reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub webhook_url: String,
    /// Signing secret; requests are unsigned when empty.
    pub secret: String,
    pub title: String,
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: String::new(),
            secret: String::new(),
            title: "HK Long-Bull Strategy Signals".to_string(),
            timeout_secs: 5,
        }
    }
}

impl NotifierConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.webhook_url.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Overridden by the `DATABASE_URL` environment variable when set.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "analysis.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Rejects settings the algorithms cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trend;
        if !(0.0..=1.0).contains(&t.min_r_squared) {
            return invalid("trend.min_r_squared must be within [0, 1]");
        }
        if t.min_annual_return_pct > t.max_annual_return_pct {
            return invalid("trend.min_annual_return_pct exceeds trend.max_annual_return_pct");
        }
        if t.short_ma_window == 0 || t.long_ma_window == 0 {
            return invalid("trend moving-average windows must be positive");
        }
        if t.trend_break_lookback == 0 {
            return invalid("trend.trend_break_lookback must be positive");
        }
        if t.min_regression_samples < 2 {
            return invalid("trend.min_regression_samples must be at least 2");
        }
        if t.window_years.is_empty() || t.window_years.iter().any(|y| !(1..=5).contains(y)) {
            return invalid("trend.window_years must list years between 1 and 5");
        }
        if t.window_years.windows(2).any(|pair| pair[0] <= pair[1]) {
            return invalid("trend.window_years must be strictly descending");
        }

        let s = &self.strategy;
        if s.short_ma_window == 0 || s.long_ma_window == 0 || s.rsi_period == 0 {
            return invalid("strategy windows must be positive");
        }
        if !(0.0..1.0).contains(&s.commission) {
            return invalid("strategy.commission must be within [0, 1)");
        }
        if s.initial_capital <= 0.0 {
            return invalid("strategy.initial_capital must be positive");
        }
        if !s.buy_range.is_well_formed() || !s.sell_range.is_well_formed() {
            return invalid("strategy grid ranges need start <= end and a positive step");
        }

        if self.signal.approach_buffer < 0.0 {
            return invalid("signal.approach_buffer must not be negative");
        }
        if self.workers.max_workers == 0 || self.workers.task_timeout_secs == 0 {
            return invalid("workers.max_workers and workers.task_timeout_secs must be positive");
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn validation_catches_inverted_return_bounds() {
        let mut cfg = Config::default();
        cfg.trend.min_annual_return_pct = 200.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn validation_requires_longest_window_first() {
        let mut cfg = Config::default();
        cfg.trend.window_years = vec![1, 5];
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError(_))));

        cfg.trend.window_years = vec![3, 3];
        assert!(cfg.validate().is_err());

        cfg.trend.window_years = vec![4, 2];
        cfg.validate().unwrap();
    }

    #[test]
    fn validation_catches_zero_step_grid() {
        let mut cfg = Config::default();
        cfg.strategy.sell_range.step = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn excluded_prefix_matching() {
        let batch = BatchConfig::default();
        assert!(batch.is_excluded("80700"));
        assert!(!batch.is_excluded("00700"));
    }
}
