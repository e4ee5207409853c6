//! # Pipeline Events
//!
//! The progress vocabulary shared by the batch drivers and whoever watches them (the CLI's
//! progress bars, run bookkeeping, tests).
//!
//! Depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;
pub mod reporter;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{PipelineEvent, RunStatus, RunSummary, Stage, StockOutcome};
pub use reporter::ProgressReporter;

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RejectReason;

    #[test]
    fn summary_counts_by_outcome() {
        let mut summary = RunSummary::start(Stage::Classify, 4);
        summary.record(&StockOutcome::Unlabeled {
            reason: RejectReason::TrendBroken,
        });
        summary.record(&StockOutcome::Skipped {
            reason: "excluded".to_string(),
        });
        summary.record(&StockOutcome::TimedOut);
        summary.record(&StockOutcome::Optimized);
        summary.finish(false);

        assert_eq!(summary.processed, 4);
        assert_eq!(
            (summary.updated, summary.cleared, summary.skipped, summary.failed),
            (1, 1, 1, 1)
        );
        assert_eq!(summary.status, RunStatus::Completed);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in [Stage::Classify, Stage::Optimize, Stage::Signals] {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("backtest".parse::<Stage>().is_err());
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let reporter = ProgressReporter::new(8);
        let mut rx = reporter.subscribe();
        reporter.emit(PipelineEvent::StageFailed {
            stage: Stage::Signals,
            error: "store offline".to_string(),
        });

        match rx.recv().await.unwrap() {
            PipelineEvent::StageFailed { stage, .. } => assert_eq!(stage, Stage::Signals),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        ProgressReporter::default().emit(PipelineEvent::StageStarted {
            run_id: uuid::Uuid::nil(),
            stage: Stage::Optimize,
            total: 0,
        });
    }
}
