use crate::regression::LinearFit;
use chrono::NaiveDate;
use core_types::{Classification, TrendLabel, TrendVerdict};
use std::fmt;

/// Outcome of one fundamentals pre-gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateCheck {
    pub value: Option<f64>,
    pub passed: bool,
}

/// State of the dead-cross / falling-long-MA circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BreakerCheck {
    /// False when the series is too short for the breaker to run.
    pub evaluated: bool,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    /// Long MA at the lookback position.
    pub long_ma_lookback: Option<f64>,
    pub tripped: bool,
}

/// Pass/fail of every gate of one calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChecks {
    pub coverage: bool,
    pub turnover: bool,
    pub interruption: bool,
    pub samples: bool,
    pub r_squared: bool,
    pub slope: bool,
    pub annual_return: bool,
}

impl WindowChecks {
    pub fn all_passed(&self) -> bool {
        self.coverage
            && self.turnover
            && self.interruption
            && self.samples
            && self.r_squared
            && self.slope
            && self.annual_return
    }

    /// Names of the gates that failed, in evaluation order.
    pub fn failures(&self) -> Vec<&'static str> {
        [
            (self.coverage, "coverage"),
            (self.turnover, "turnover"),
            (self.interruption, "interruption"),
            (self.samples, "samples"),
            (self.r_squared, "r_squared"),
            (self.slope, "slope"),
            (self.annual_return, "annual_return"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| (!ok).then_some(name))
        .collect()
    }
}

/// Measured values and gate results for one calendar window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDiagnosis {
    pub years: u32,
    pub target_start: NaiveDate,
    pub first_date: Option<NaiveDate>,
    pub bars: usize,
    /// Days between the target start and the first bar actually in the window.
    pub coverage_gap_days: Option<i64>,
    pub avg_turnover: Option<f64>,
    /// Longest streak of closes below the long MA; `None` when the MA never has a value.
    pub longest_below_run: Option<usize>,
    pub below_run_start: Option<NaiveDate>,
    pub fit: Option<LinearFit>,
    pub checks: WindowChecks,
}

impl WindowDiagnosis {
    pub fn passed(&self) -> bool {
        self.checks.all_passed()
    }

    pub fn annualized_return_pct(&self) -> Option<f64> {
        self.fit.map(|f| f.annualized_return_pct())
    }

    /// The verdict this window grants, if every gate passed.
    pub fn verdict(&self) -> Option<TrendVerdict> {
        if !self.passed() {
            return None;
        }
        let fit = self.fit?;
        let label = TrendLabel::new(self.years).ok()?;
        Some(TrendVerdict {
            label,
            period_years: self.years,
            r_squared: fit.r_squared,
            annualized_return_pct: fit.annualized_return_pct(),
            slope: fit.slope,
            avg_turnover: self.avg_turnover.unwrap_or_default(),
        })
    }
}

/// Full gate report for one stock. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub code: String,
    pub latest_date: Option<NaiveDate>,
    pub bars: usize,
    pub market_cap: GateCheck,
    pub roe: GateCheck,
    pub breaker: BreakerCheck,
    pub windows: Vec<WindowDiagnosis>,
    /// What `classify` returns for the same input.
    pub classification: Classification,
}

fn mark(ok: bool) -> &'static str {
    if ok { "PASS" } else { "FAIL" }
}

fn opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} | {} bars | latest {}",
            self.code,
            self.bars,
            opt(self.latest_date)
        )?;
        writeln!(
            f,
            "  [{}] market cap: {}",
            mark(self.market_cap.passed),
            opt(self.market_cap.value.map(|v| format!("{:.0}", v)))
        )?;
        writeln!(
            f,
            "  [{}] ROE %: {}",
            mark(self.roe.passed),
            opt(self.roe.value.map(|v| format!("{:.2}", v)))
        )?;
        if self.breaker.evaluated {
            writeln!(
                f,
                "  [{}] trend breaker: short MA {} / long MA {} / long MA lookback {}",
                mark(!self.breaker.tripped),
                opt(self.breaker.short_ma.map(|v| format!("{:.3}", v))),
                opt(self.breaker.long_ma.map(|v| format!("{:.3}", v))),
                opt(self.breaker.long_ma_lookback.map(|v| format!("{:.3}", v))),
            )?;
        } else {
            writeln!(f, "  [SKIP] trend breaker: series too short")?;
        }

        for w in &self.windows {
            writeln!(f, "  {}y window from {}:", w.years, w.target_start)?;
            let c = &w.checks;
            writeln!(
                f,
                "    [{}] coverage: first bar {} (gap {} days)",
                mark(c.coverage),
                opt(w.first_date),
                opt(w.coverage_gap_days)
            )?;
            writeln!(
                f,
                "    [{}] avg turnover: {}",
                mark(c.turnover),
                opt(w.avg_turnover.map(|v| format!("{:.0}", v)))
            )?;
            writeln!(
                f,
                "    [{}] longest run below long MA: {} (from {})",
                mark(c.interruption),
                opt(w.longest_below_run),
                opt(w.below_run_start)
            )?;
            writeln!(f, "    [{}] samples: {}", mark(c.samples), w.bars)?;
            match w.fit {
                Some(fit) => {
                    writeln!(f, "    [{}] r2: {:.4}", mark(c.r_squared), fit.r_squared)?;
                    writeln!(f, "    [{}] slope: {:.6}", mark(c.slope), fit.slope)?;
                    writeln!(
                        f,
                        "    [{}] annualized return: {:.2}%",
                        mark(c.annual_return),
                        fit.annualized_return_pct()
                    )?;
                }
                None => writeln!(f, "    [FAIL] regression: not enough data")?,
            }
        }

        match &self.classification {
            Classification::Bull(v) => write!(f, "  => {}", v.label),
            Classification::Unqualified(reason) => write!(f, "  => unqualified ({})", reason),
        }
    }
}
