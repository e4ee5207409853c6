use crate::{Pipeline, PipelineError};
use core_types::{PriceSeries, StrategyParams};
use database::LabeledStock;
use events::{RunSummary, Stage, StockOutcome};
use optimizer::{OptimizationJob, OptimizerError, TaskOutcome};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, warn};

type JobOutcome = TaskOutcome<Result<Option<StrategyParams>, OptimizerError>>;

/// A `JoinSet` that remembers which stock each task belongs to, even when the task fails.
struct InFlight<T> {
    tasks: JoinSet<T>,
    codes: HashMap<Id, String>,
}

impl<T: Send + 'static> InFlight<T> {
    fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            codes: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn spawn<F>(&mut self, code: String, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let handle = self.tasks.spawn(task);
        self.codes.insert(handle.id(), code);
    }

    async fn join_next(&mut self) -> Option<(String, Result<T, JoinError>)> {
        let joined = self.tasks.join_next_with_id().await?;
        let id = match &joined {
            Ok((id, _)) => *id,
            Err(e) => e.id(),
        };
        let code = self.codes.remove(&id).unwrap_or_default();
        Some((code, joined.map(|(_, value)| value)))
    }
}

impl Pipeline {
    /// Optimizes every labeled stock on the worker pool.
    ///
    /// At most `workers` searches are in flight. Results are stored as they complete, in no
    /// particular order. A stock with no qualifying cell has its strategy cleared; a timed-out,
    /// failed or interrupted one keeps its previous strategy.
    pub async fn optimize_all(&self) -> Result<RunSummary, PipelineError> {
        let labeled = self.repo.list_labeled().await?;
        let mut summary = self.begin_stage(Stage::Optimize, labeled.len()).await;
        let mut in_flight: InFlight<JobOutcome> = InFlight::new();
        let limit = self.pool.workers();
        let mut cancelled = false;

        for stock in &labeled {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let code = stock.listing.code.as_str();
            if self.is_excluded(code) {
                self.record(
                    &mut summary,
                    code,
                    StockOutcome::Skipped {
                        reason: "excluded code".to_string(),
                    },
                );
                continue;
            }

            let job = match self.load_job(stock).await {
                Ok(job) => job,
                Err(e) => {
                    warn!(code, error = %e, "Failed to load stock; keeping previous strategy");
                    self.record(
                        &mut summary,
                        code,
                        StockOutcome::Failed {
                            error: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            while in_flight.len() >= limit {
                if let Some((code, joined)) = in_flight.join_next().await {
                    self.apply(&mut summary, &code, joined).await;
                }
            }

            let pool = self.pool.clone();
            let optimizer = Arc::clone(&self.optimizer);
            let cancel = self.cancel.clone();
            in_flight.spawn(job.code.clone(), async move {
                pool.execute(&cancel, move |token| optimizer.optimize(&job, token)).await
            });
        }

        while let Some((code, joined)) = in_flight.join_next().await {
            self.apply(&mut summary, &code, joined).await;
        }

        let cancelled = cancelled || self.cancel.is_cancelled();
        Ok(self.end_stage(summary, cancelled).await)
    }

    async fn load_job(&self, stock: &LabeledStock) -> Result<OptimizationJob, PipelineError> {
        let code = &stock.listing.code;
        let snapshot = self.repo.load_snapshot(code).await?;
        Ok(OptimizationJob {
            code: code.clone(),
            period_years: stock.verdict.period_years,
            series: PriceSeries::new(code.clone(), snapshot.history),
        })
    }

    async fn apply(
        &self,
        summary: &mut RunSummary,
        code: &str,
        joined: Result<JobOutcome, JoinError>,
    ) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(code, error = %e, "Optimization task aborted");
                self.record(
                    summary,
                    code,
                    StockOutcome::Failed {
                        error: e.to_string(),
                    },
                );
                return;
            }
        };

        let outcome = match outcome {
            TaskOutcome::Completed(Ok(Some(params))) => {
                match self.repo.save_strategy(code, Some(&params)).await {
                    Ok(()) => {
                        info!(
                            code = %code,
                            buy = %params.buy_bias_threshold_pct,
                            sell = %params.sell_bias_threshold_pct,
                            total_return = %params.total_return_pct,
                            benchmark = %params.benchmark_return_pct,
                            trades = params.trade_count,
                            "Strategy optimized"
                        );
                        StockOutcome::Optimized
                    }
                    Err(e) => StockOutcome::Failed {
                        error: e.to_string(),
                    },
                }
            }
            TaskOutcome::Completed(Ok(None)) => match self.repo.save_strategy(code, None).await {
                Ok(()) => StockOutcome::NoResult,
                Err(e) => StockOutcome::Failed {
                    error: e.to_string(),
                },
            },
            TaskOutcome::Completed(Err(OptimizerError::Interrupted)) | TaskOutcome::Cancelled => {
                StockOutcome::Skipped {
                    reason: "interrupted".to_string(),
                }
            }
            TaskOutcome::Completed(Err(e)) => StockOutcome::Failed {
                error: e.to_string(),
            },
            TaskOutcome::Panicked(message) => {
                error!(code = %code, panic = %message, "Optimization panicked");
                StockOutcome::Failed { error: message }
            }
            TaskOutcome::TimedOut => {
                warn!(code = %code, "Optimization timed out; keeping previous strategy");
                StockOutcome::TimedOut
            }
        };

        if let StockOutcome::Failed { error } = &outcome {
            warn!(code = %code, error = %error, "Optimization failed; keeping previous strategy");
        }
        self.record(summary, code, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lost_worker() -> u32 {
        panic!("lost worker")
    }

    #[tokio::test]
    async fn failed_task_keeps_its_stock_code() {
        let mut in_flight: InFlight<u32> = InFlight::new();
        in_flight.spawn("00700".to_string(), async { 7 });
        in_flight.spawn("00005".to_string(), lost_worker());

        let mut results = Vec::new();
        while let Some((code, joined)) = in_flight.join_next().await {
            results.push((code, joined.map_err(|e| e.is_panic())));
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            results,
            vec![
                ("00005".to_string(), Err(true)),
                ("00700".to_string(), Ok(7)),
            ]
        );
        assert!(in_flight.codes.is_empty());
    }
}
