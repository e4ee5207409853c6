use crate::{Pipeline, PipelineError};
use chrono::NaiveDate;
use classifier::Diagnosis;
use core_types::{PriceSeries, SignalReport};
use events::{PipelineEvent, RunSummary, Stage};
use tracing::{error, info};

/// What a full pipeline run accomplished.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// One summary per stage that ran, in order.
    pub stages: Vec<RunSummary>,
    /// The signal report, when the signal stage ran.
    pub signals: Option<SignalReport>,
}

impl Pipeline {
    /// Runs classify, optimize and signals in order.
    ///
    /// A cancelled stage ends the run after that stage. A stage that aborts sends a failure
    /// notice through the sink and returns its error.
    pub async fn run_all(&self, as_of: NaiveDate) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        let classified = self.guard(Stage::Classify, self.classify_all().await).await?;
        report.stages.push(classified);
        if self.cancel.is_cancelled() {
            return Ok(report);
        }

        let optimized = self.guard(Stage::Optimize, self.optimize_all().await).await?;
        report.stages.push(optimized);
        if self.cancel.is_cancelled() {
            return Ok(report);
        }

        let run = self.guard(Stage::Signals, self.check_signals(as_of).await).await?;
        report.stages.push(run.summary);
        report.signals = Some(run.report);

        info!(stages = report.stages.len(), "Pipeline run complete");
        Ok(report)
    }

    /// Reports a stage failure to observers and the sink, then passes the result through.
    async fn guard<T>(
        &self,
        stage: Stage,
        result: Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        if let Err(e) = &result {
            error!(%stage, error = %e, "Stage failed");
            self.reporter.emit(PipelineEvent::StageFailed {
                stage,
                error: e.to_string(),
            });
            let notice = format!("{} stage failed: {}", stage, e);
            if let Err(send_err) = self.sink.deliver_failure(&notice).await {
                error!(error = %send_err, "Failed to deliver failure notice");
            }
        }
        result
    }

    /// Explains every classification gate for one stock, optionally as of a past date.
    /// Nothing is persisted.
    pub async fn diagnose(
        &self,
        code: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Diagnosis, PipelineError> {
        let snapshot = self.repo.load_snapshot(code).await?;
        let mut series = PriceSeries::new(code, snapshot.history);
        if let Some(date) = as_of {
            series = series.up_to(date);
        }
        Ok(self.classifier.diagnose(&series, &snapshot.fundamentals)?)
    }
}
