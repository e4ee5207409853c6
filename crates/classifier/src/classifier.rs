use crate::diagnostics::{BreakerCheck, Diagnosis, GateCheck, WindowChecks, WindowDiagnosis};
use crate::error::ClassifierError;
use crate::regression::fit_log_linear;
use crate::window::{longest_run_below, window_start};
use chrono::NaiveDate;
use configuration::TrendConfig;
use core_types::{Classification, Fundamentals, PriceSeries, RejectReason};
use indicators::sma;
use tracing::debug;

/// Grades a stock's trailing price history as a long-bull trend (or not).
///
/// The classifier is stateless between calls: every classification is computed from the
/// series and fundamentals passed in, so repeated runs on the same input are identical.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    config: TrendConfig,
}

/// Columns computed once over the full series and shared by every window.
struct Prepared<'a> {
    series: &'a PriceSeries,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
    turnover: Vec<f64>,
    short_ma: Vec<Option<f64>>,
    long_ma: Vec<Option<f64>>,
}

impl TrendClassifier {
    pub fn new(config: TrendConfig) -> Result<Self, ClassifierError> {
        if config.window_years.is_empty() {
            return Err(ClassifierError::InvalidConfig(
                "at least one window is required".to_string(),
            ));
        }
        if config.window_years.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err(ClassifierError::InvalidConfig(
                "windows must be listed longest first".to_string(),
            ));
        }
        if config.short_ma_window == 0 || config.long_ma_window == 0 {
            return Err(ClassifierError::InvalidConfig(
                "moving-average windows must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Runs the pre-gates, the circuit breaker, then the windows from longest to shortest,
    /// returning the first window that passes every gate.
    pub fn classify(
        &self,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
    ) -> Result<Classification, ClassifierError> {
        let (mcap, roe) = self.pre_gates(fundamentals);
        if !mcap.passed {
            debug!(code = series.code(), market_cap = ?mcap.value, "Rejected by market cap gate");
            return Ok(Classification::Unqualified(RejectReason::MarketCapBelowFloor));
        }
        if !roe.passed {
            debug!(code = series.code(), roe = ?roe.value, "Rejected by ROE gate");
            return Ok(Classification::Unqualified(RejectReason::NonPositiveRoe));
        }
        if series.is_empty() {
            return Ok(Classification::Unqualified(RejectReason::EmptyHistory));
        }

        let prep = self.prepare(series)?;
        if self.breaker(&prep).tripped {
            debug!(code = series.code(), "Trend broken: dead cross with falling long MA");
            return Ok(Classification::Unqualified(RejectReason::TrendBroken));
        }

        for &years in &self.config.window_years {
            let window = self.evaluate_window(&prep, years);
            if let Some(verdict) = window.verdict() {
                debug!(
                    code = series.code(),
                    period_years = years,
                    r_squared = verdict.r_squared,
                    annual_return = verdict.annualized_return_pct,
                    "Window qualified"
                );
                return Ok(Classification::Bull(verdict));
            }
            debug!(
                code = series.code(),
                period_years = years,
                failed = ?window.checks.failures(),
                "Window rejected"
            );
        }
        Ok(Classification::Unqualified(RejectReason::NoQualifyingWindow))
    }

    /// Evaluates every gate of every window without short-circuiting.
    pub fn diagnose(
        &self,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
    ) -> Result<Diagnosis, ClassifierError> {
        let (market_cap, roe) = self.pre_gates(fundamentals);
        let classification = self.classify(series, fundamentals)?;

        let (breaker, windows) = if series.is_empty() {
            (BreakerCheck::default(), Vec::new())
        } else {
            let prep = self.prepare(series)?;
            let windows = self
                .config
                .window_years
                .iter()
                .map(|&years| self.evaluate_window(&prep, years))
                .collect();
            (self.breaker(&prep), windows)
        };

        Ok(Diagnosis {
            code: series.code().to_string(),
            latest_date: series.latest().map(|p| p.date),
            bars: series.len(),
            market_cap,
            roe,
            breaker,
            windows,
            classification,
        })
    }

    fn pre_gates(&self, fundamentals: &Fundamentals) -> (GateCheck, GateCheck) {
        let mcap = GateCheck {
            value: fundamentals.market_cap,
            passed: fundamentals
                .market_cap
                .is_some_and(|v| v >= self.config.min_market_cap),
        };
        let roe = GateCheck {
            value: fundamentals.roe_pct,
            passed: fundamentals.roe_pct.is_some_and(|v| v > 0.0),
        };
        (mcap, roe)
    }

    fn prepare<'a>(&self, series: &'a PriceSeries) -> Result<Prepared<'a>, ClassifierError> {
        let closes = series.closes();
        Ok(Prepared {
            series,
            dates: series.dates(),
            turnover: series.points().iter().map(|p| p.turnover()).collect(),
            short_ma: sma(&closes, self.config.short_ma_window)?,
            long_ma: sma(&closes, self.config.long_ma_window)?,
            closes,
        })
    }

    fn breaker(&self, prep: &Prepared<'_>) -> BreakerCheck {
        let n = prep.closes.len();
        if n <= self.config.trend_break_check_days {
            return BreakerCheck::default();
        }
        let last = n - 1;
        let short_ma = prep.short_ma[last];
        let long_ma = prep.long_ma[last];
        let long_ma_lookback = n
            .checked_sub(self.config.trend_break_lookback)
            .and_then(|i| prep.long_ma[i]);

        let tripped = matches!(
            (short_ma, long_ma, long_ma_lookback),
            (Some(s), Some(l), Some(prev)) if s < l && l < prev
        );
        BreakerCheck {
            evaluated: true,
            short_ma,
            long_ma,
            long_ma_lookback,
            tripped,
        }
    }

    fn evaluate_window(&self, prep: &Prepared<'_>, years: u32) -> WindowDiagnosis {
        let cfg = &self.config;
        // `prepare` is only called on non-empty series.
        let latest = prep.dates[prep.dates.len() - 1];
        let target_start = window_start(latest, years);
        let start = prep.series.index_on_or_after(target_start);

        let mut diag = WindowDiagnosis {
            years,
            target_start,
            first_date: None,
            bars: 0,
            coverage_gap_days: None,
            avg_turnover: None,
            longest_below_run: None,
            below_run_start: None,
            fit: None,
            checks: WindowChecks::default(),
        };
        let Some(start) = start else {
            return diag;
        };

        let dates = &prep.dates[start..];
        let closes = &prep.closes[start..];
        diag.bars = closes.len();
        diag.first_date = Some(dates[0]);

        let gap = (dates[0] - target_start).num_days();
        diag.coverage_gap_days = Some(gap);
        diag.checks.coverage = gap <= cfg.max_coverage_gap_days;

        let turnover = &prep.turnover[start..];
        let avg_turnover = turnover.iter().sum::<f64>() / turnover.len() as f64;
        diag.avg_turnover = Some(avg_turnover);
        diag.checks.turnover = avg_turnover >= cfg.min_turnover;

        // The long MA comes from the full history, so early window rows already have values.
        if let Some(run) = longest_run_below(&prep.closes, &prep.long_ma, start) {
            diag.longest_below_run = Some(run.length);
            diag.below_run_start = run.start.map(|i| prep.dates[i]);
            diag.checks.interruption = run.length < cfg.max_interruption_days;
        }

        diag.checks.samples =
            closes.len() >= cfg.min_regression_samples && closes.iter().all(|&c| c > 0.0);

        if let Some(fit) = fit_log_linear(dates, closes) {
            let annual = fit.annualized_return_pct();
            diag.checks.r_squared = fit.r_squared >= cfg.min_r_squared;
            diag.checks.slope = fit.slope > 0.0;
            diag.checks.annual_return =
                (cfg.min_annual_return_pct..=cfg.max_annual_return_pct).contains(&annual);
            diag.fit = Some(fit);
        }

        diag
    }
}
