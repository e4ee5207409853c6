//! # Long-Bull Pipeline
//!
//! The batch drivers. A [`Pipeline`] owns the analysis components and walks the stock
//! universe through three stages:
//!
//! 1. **classify**: grade every stock's trend and store (or clear) its verdict.
//! 2. **optimize**: grid-search bias thresholds for every labeled stock on a bounded pool.
//! 3. **signals**: check the latest bars against the stored thresholds and notify.
//!
//! Each stage is recorded as a run, publishes [`PipelineEvent`]s while it works and stops
//! between stocks once the cancellation token fires. Whatever was persisted before the stop
//! stays valid.

use alerter::NotificationSink;
use classifier::TrendClassifier;
use configuration::Config;
use database::StockRepository;
use events::{PipelineEvent, ProgressReporter, RunSummary, Stage, StockOutcome};
use optimizer::{GridOptimizer, WorkerPool};
use signals::SignalEvaluator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod classify;
pub mod error;
pub mod optimize;
pub mod run;
pub mod signal_check;

pub use error::PipelineError;
pub use run::PipelineReport;
pub use signal_check::SignalRun;

/// The central orchestrator for batch analysis runs.
pub struct Pipeline {
    // --- Configuration ---
    config: Config,

    // --- Shared Collaborators ---
    repo: Arc<dyn StockRepository>,
    sink: Arc<dyn NotificationSink>,
    reporter: ProgressReporter,
    cancel: CancellationToken,

    // --- Analysis Components ---
    classifier: TrendClassifier,
    optimizer: Arc<GridOptimizer>,
    pool: WorkerPool,
    evaluator: SignalEvaluator,
}

impl Pipeline {
    /// Builds every component from the configuration. Fails on invalid settings.
    pub fn new(
        config: Config,
        repo: Arc<dyn StockRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, PipelineError> {
        let classifier = TrendClassifier::new(config.trend.clone())?;
        let optimizer = Arc::new(GridOptimizer::new(config.strategy.clone())?);
        let pool = WorkerPool::from_config(&config.workers)?;
        let evaluator = SignalEvaluator::new(config.strategy.clone(), config.signal.clone());

        info!(
            workers = pool.workers(),
            grid_cells = optimizer.grid().len(),
            variant = %config.strategy.variant,
            "Pipeline ready"
        );

        Ok(Self {
            config,
            repo,
            sink,
            reporter: ProgressReporter::default(),
            cancel: CancellationToken::new(),
            classifier,
            optimizer,
            pool,
            evaluator,
        })
    }

    /// Replaces the stop-request token, e.g. with one wired to Ctrl-C.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replaces the optimization pool built from `workers` settings.
    pub fn with_worker_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn repository(&self) -> &Arc<dyn StockRepository> {
        &self.repo
    }

    fn is_excluded(&self, code: &str) -> bool {
        self.config.batch.is_excluded(code)
    }

    /// Opens the bookkeeping record of a stage run and announces it.
    async fn begin_stage(&self, stage: Stage, total: usize) -> RunSummary {
        let summary = RunSummary::start(stage, total);
        if let Err(e) = self.repo.start_run(&summary).await {
            warn!(error = %e, %stage, "Failed to record run start");
        }
        info!(run_id = %summary.run_id, %stage, total, "Stage started");
        self.reporter.emit(PipelineEvent::StageStarted {
            run_id: summary.run_id,
            stage,
            total,
        });
        summary
    }

    fn record(&self, summary: &mut RunSummary, code: &str, outcome: StockOutcome) {
        summary.record(&outcome);
        self.reporter.emit(PipelineEvent::StockProcessed {
            stage: summary.stage,
            code: code.to_string(),
            outcome,
        });
    }

    async fn end_stage(&self, mut summary: RunSummary, cancelled: bool) -> RunSummary {
        summary.finish(cancelled);
        if let Err(e) = self.repo.finish_run(&summary).await {
            warn!(error = %e, stage = %summary.stage, "Failed to record run completion");
        }
        info!(
            run_id = %summary.run_id,
            stage = %summary.stage,
            status = %summary.status,
            processed = summary.processed,
            updated = summary.updated,
            cleared = summary.cleared,
            skipped = summary.skipped,
            failed = summary.failed,
            "Stage finished"
        );
        self.reporter
            .emit(PipelineEvent::StageFinished(summary.clone()));
        summary
    }

    /// Sleeps for `pause`, returning early (with `true`) if cancellation is requested.
    async fn pause(&self, pause: std::time::Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(pause) => false,
        }
    }
}
