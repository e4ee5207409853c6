use crate::enums::SignalKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One stock meeting (or approaching) one of its optimized thresholds on the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalHit {
    pub code: String,
    pub name: String,
    pub kind: SignalKind,
    /// Date of the bar the signal was read from.
    pub date: NaiveDate,
    pub close: f64,
    /// The bias that was compared, in percent (long MA for buys, short MA for sells).
    pub bias_pct: f64,
    pub threshold_pct: f64,
    pub rsi: Option<f64>,
    /// True when a sell came from the RSI momentum-exhaustion path rather than the full threshold.
    pub early_exit: bool,
    /// Consecutive bars (including the latest) on which the trigger condition held.
    pub duration_days: Option<usize>,
    pub active_since: Option<NaiveDate>,
    /// Human-readable line describing the hit.
    pub message: String,
}

/// All hits of one signal-check run, grouped by the sink when rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub generated_at: NaiveDateTime,
    pub hits: Vec<SignalHit>,
}

impl SignalReport {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            hits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn of_kind(&self, kind: SignalKind) -> impl Iterator<Item = &SignalHit> + '_ {
        self.hits.iter().filter(move |h| h.kind == kind)
    }

    pub fn count(&self, kind: SignalKind) -> usize {
        self.of_kind(kind).count()
    }
}
