use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::{RejectReason, SignalKind, TrendLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The batch stages of the analysis pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Optimize,
    Signals,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classify => "classify",
            Stage::Optimize => "optimize",
            Stage::Signals => "signals",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EventsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classify" => Ok(Stage::Classify),
            "optimize" => Ok(Stage::Optimize),
            "signals" => Ok(Stage::Signals),
            other => Err(EventsError::UnknownStage(other.to_string())),
        }
    }
}

/// What happened to one stock within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockOutcome {
    /// Classification granted a label.
    Labeled { label: TrendLabel },
    /// Classification found no label; prior verdict and strategy were cleared.
    Unlabeled { reason: RejectReason },
    /// A new strategy was stored.
    Optimized,
    /// The optimizer found no qualifying cell; the prior strategy was cleared.
    NoResult,
    /// The signal check produced these hits (possibly none).
    Checked { hits: Vec<SignalKind> },
    /// Not processed (excluded code, stale or missing data). Stored state untouched.
    Skipped { reason: String },
    /// Processing failed. Stored state untouched.
    Failed { error: String },
    /// The per-stock time limit was hit. Stored state untouched.
    TimedOut,
}

impl StockOutcome {
    /// True when the stage wrote something for this stock.
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            StockOutcome::Labeled { .. } | StockOutcome::Optimized | StockOutcome::Checked { .. }
        )
    }

    /// True when the stage cleared stored results for this stock.
    pub fn is_clear(&self) -> bool {
        matches!(self, StockOutcome::Unlabeled { .. } | StockOutcome::NoResult)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StockOutcome::Failed { .. } | StockOutcome::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one stage run. Counters are filled in as stocks complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub stage: Stage,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub processed: usize,
    pub updated: usize,
    pub cleared: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn start(stage: Stage, total: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            total,
            processed: 0,
            updated: 0,
            cleared: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, outcome: &StockOutcome) {
        self.processed += 1;
        if outcome.is_update() {
            self.updated += 1;
        } else if outcome.is_clear() {
            self.cleared += 1;
        } else if outcome.is_failure() {
            self.failed += 1;
        } else {
            self.skipped += 1;
        }
    }

    pub fn finish(&mut self, cancelled: bool) {
        self.status = if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        self.finished_at = Some(Utc::now());
    }
}

/// Progress messages published by the batch drivers.
///
/// Serialized as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PipelineEvent {
    StageStarted {
        run_id: Uuid,
        stage: Stage,
        total: usize,
    },
    StockProcessed {
        stage: Stage,
        code: String,
        outcome: StockOutcome,
    },
    StageFinished(RunSummary),
    /// A stage aborted on an infrastructure error.
    StageFailed { stage: Stage, error: String },
}
