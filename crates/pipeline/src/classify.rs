use crate::{Pipeline, PipelineError};
use core_types::{Classification, PriceSeries};
use events::{RunSummary, Stage, StockOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

impl Pipeline {
    /// Classifies the whole universe, one stock at a time.
    ///
    /// A labeled stock has its verdict replaced. An unlabeled one has its verdict and its
    /// strategy cleared. Stocks that cannot be loaded or stored keep their previous state.
    pub async fn classify_all(&self) -> Result<RunSummary, PipelineError> {
        let universe = self.repo.list_stocks().await?;
        let mut summary = self.begin_stage(Stage::Classify, universe.len()).await;
        let batch = &self.config.batch;
        let pause = Duration::from_millis(batch.yield_pause_ms);
        let mut cancelled = false;

        for (i, listing) in universe.iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if batch.yield_every > 0 && i > 0 && i % batch.yield_every == 0 && self.pause(pause).await
            {
                cancelled = true;
                break;
            }

            let outcome = if self.is_excluded(&listing.code) {
                StockOutcome::Skipped {
                    reason: "excluded code".to_string(),
                }
            } else {
                self.classify_one(&listing.code).await
            };
            self.record(&mut summary, &listing.code, outcome);
        }

        if cancelled {
            info!(processed = summary.processed, "Classification interrupted");
        }
        Ok(self.end_stage(summary, cancelled).await)
    }

    async fn classify_one(&self, code: &str) -> StockOutcome {
        let snapshot = match self.repo.load_snapshot(code).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(code, error = %e, "Failed to load stock; keeping previous verdict");
                return StockOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let series = PriceSeries::new(code, snapshot.history);
        let classification = match self.classifier.classify(&series, &snapshot.fundamentals) {
            Ok(c) => c,
            Err(e) => {
                warn!(code, error = %e, "Classification failed; keeping previous verdict");
                return StockOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let stored = match &classification {
            Classification::Bull(verdict) => self.repo.save_verdict(code, Some(verdict)).await,
            Classification::Unqualified(_) => {
                // A strategy tuned for a window that no longer qualifies is stale.
                match self.repo.save_verdict(code, None).await {
                    Ok(()) => self.repo.save_strategy(code, None).await,
                    Err(e) => Err(e),
                }
            }
        };
        if let Err(e) = stored {
            warn!(code, error = %e, "Failed to store classification");
            return StockOutcome::Failed {
                error: e.to_string(),
            };
        }

        match classification {
            Classification::Bull(verdict) => {
                info!(
                    code,
                    label = %verdict.label,
                    r_squared = verdict.r_squared,
                    annual_return = verdict.annualized_return_pct,
                    "Stock labeled"
                );
                StockOutcome::Labeled {
                    label: verdict.label,
                }
            }
            Classification::Unqualified(reason) => {
                debug!(code, %reason, "Stock unlabeled");
                StockOutcome::Unlabeled { reason }
            }
        }
    }
}
