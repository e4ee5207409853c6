use crate::{Pipeline, PipelineError};
use chrono::NaiveDate;
use core_types::{PriceSeries, SignalReport, StockListing, StrategyParams};
use events::{RunSummary, Stage, StockOutcome};
use signals::{Evaluation, SkipReason};
use tracing::{error, info, warn};

/// Result of one signal-check stage.
#[derive(Debug, Clone)]
pub struct SignalRun {
    pub summary: RunSummary,
    pub report: SignalReport,
    /// Whether the report was handed to the sink (only non-empty reports are).
    pub delivered: bool,
}

impl Pipeline {
    /// Checks every stock holding a strategy against its latest bars as of `as_of`.
    ///
    /// All hits are collected into one report, which is sent only when it is not empty.
    /// A failed delivery is logged; the stage itself still succeeds.
    pub async fn check_signals(&self, as_of: NaiveDate) -> Result<SignalRun, PipelineError> {
        let candidates: Vec<(StockListing, StrategyParams)> = self
            .repo
            .list_labeled()
            .await?
            .into_iter()
            .filter_map(|stock| stock.strategy.map(|params| (stock.listing, params)))
            .collect();

        let mut summary = self.begin_stage(Stage::Signals, candidates.len()).await;
        let mut report = SignalReport::new(chrono::Local::now().naive_local());
        let mut cancelled = false;

        for (listing, params) in &candidates {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let outcome = if self.is_excluded(&listing.code) {
                StockOutcome::Skipped {
                    reason: "excluded code".to_string(),
                }
            } else {
                self.check_one(listing, params, as_of, &mut report).await
            };
            self.record(&mut summary, &listing.code, outcome);
        }

        let summary = self.end_stage(summary, cancelled).await;

        let delivered = if report.is_empty() {
            info!("No signals today; nothing sent");
            false
        } else {
            match self.sink.deliver(&report).await {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, hits = report.hits.len(), "Failed to deliver signal report");
                    false
                }
            }
        };

        Ok(SignalRun {
            summary,
            report,
            delivered,
        })
    }

    async fn check_one(
        &self,
        listing: &StockListing,
        params: &StrategyParams,
        as_of: NaiveDate,
        report: &mut SignalReport,
    ) -> StockOutcome {
        let code = listing.code.as_str();
        let history = match self
            .repo
            .load_recent_history(code, self.config.signal.history_bars)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(code, error = %e, "Failed to load recent history");
                return StockOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let series = PriceSeries::new(code, history);
        match self.evaluator.evaluate(listing, params, &series, as_of) {
            Ok(Evaluation::Checked(hits)) => {
                let kinds = hits.iter().map(|h| h.kind).collect();
                for hit in &hits {
                    info!(code, kind = %hit.kind, bias = hit.bias_pct, "{}", hit.message);
                }
                report.hits.extend(hits);
                StockOutcome::Checked { hits: kinds }
            }
            Ok(Evaluation::Skipped(reason)) => StockOutcome::Skipped {
                reason: match reason {
                    SkipReason::InsufficientHistory { bars } => {
                        format!("only {} bars of history", bars)
                    }
                    SkipReason::Stale { latest } => format!("stale data, latest bar {}", latest),
                },
            },
            Err(e) => {
                warn!(code, error = %e, "Signal evaluation failed");
                StockOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
