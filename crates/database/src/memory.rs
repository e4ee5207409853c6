use crate::error::DbError;
use crate::repository::{LabeledStock, StockRepository, stored_verdict};
use async_trait::async_trait;
use core_types::{
    PriceSeries, PricePoint, StockListing, StockSnapshot, StrategyParams, TrendVerdict,
};
use events::RunSummary;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredStock {
    snapshot: StockSnapshot,
    verdict: Option<TrendVerdict>,
    strategy: Option<StrategyParams>,
}

#[derive(Debug, Default)]
struct MemoryState {
    stocks: BTreeMap<String, StoredStock>,
    runs: Vec<RunSummary>,
}

/// A [`StockRepository`] held entirely in memory.
///
/// Used by the `--offline` mode of the CLI and by tests. Behaves like the PostgreSQL store,
/// including verdict rounding and upsert-by-date of bars.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(snapshots: impl IntoIterator<Item = StockSnapshot>) -> Self {
        let stocks = snapshots
            .into_iter()
            .map(|snapshot| {
                let stored = StoredStock {
                    snapshot,
                    verdict: None,
                    strategy: None,
                };
                (stored.snapshot.code.clone(), stored)
            })
            .collect();
        Self {
            state: RwLock::new(MemoryState {
                stocks,
                runs: Vec::new(),
            }),
        }
    }

    pub async fn verdict(&self, code: &str) -> Option<TrendVerdict> {
        self.state.read().await.stocks.get(code).and_then(|s| s.verdict)
    }

    pub async fn strategy(&self, code: &str) -> Option<StrategyParams> {
        self.state
            .read()
            .await
            .stocks
            .get(code)
            .and_then(|s| s.strategy.clone())
    }

    /// Every run recorded so far, latest state of each.
    pub async fn runs(&self) -> Vec<RunSummary> {
        self.state.read().await.runs.clone()
    }
}

#[async_trait]
impl StockRepository for InMemoryRepository {
    async fn list_stocks(&self) -> Result<Vec<StockListing>, DbError> {
        let state = self.state.read().await;
        Ok(state.stocks.values().map(|s| s.snapshot.listing()).collect())
    }

    async fn load_snapshot(&self, code: &str) -> Result<StockSnapshot, DbError> {
        let state = self.state.read().await;
        state
            .stocks
            .get(code)
            .map(|s| s.snapshot.clone())
            .ok_or_else(|| DbError::NotFound(code.to_string()))
    }

    async fn load_recent_history(
        &self,
        code: &str,
        bars: usize,
    ) -> Result<Vec<PricePoint>, DbError> {
        let state = self.state.read().await;
        let stored = state
            .stocks
            .get(code)
            .ok_or_else(|| DbError::NotFound(code.to_string()))?;
        let history = &stored.snapshot.history;
        let start = history.len().saturating_sub(bars);
        Ok(history[start..].to_vec())
    }

    async fn upsert_stock(&self, snapshot: &StockSnapshot) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        match state.stocks.get_mut(&snapshot.code) {
            Some(stored) => {
                let mut merged = std::mem::take(&mut stored.snapshot.history);
                merged.extend(snapshot.history.iter().copied());
                // Later records win on a shared date, matching ON CONFLICT DO UPDATE.
                let series = PriceSeries::new(snapshot.code.clone(), merged);
                stored.snapshot = StockSnapshot {
                    history: series.points().to_vec(),
                    ..snapshot.clone()
                };
            }
            None => {
                state.stocks.insert(
                    snapshot.code.clone(),
                    StoredStock {
                        snapshot: snapshot.clone(),
                        verdict: None,
                        strategy: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn save_verdict(
        &self,
        code: &str,
        verdict: Option<&TrendVerdict>,
    ) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let stored = state
            .stocks
            .get_mut(code)
            .ok_or_else(|| DbError::NotFound(code.to_string()))?;
        stored.verdict = verdict.map(stored_verdict);
        Ok(())
    }

    async fn list_labeled(&self) -> Result<Vec<LabeledStock>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .stocks
            .values()
            .filter_map(|s| {
                s.verdict.map(|verdict| LabeledStock {
                    listing: s.snapshot.listing(),
                    verdict,
                    strategy: s.strategy.clone(),
                })
            })
            .collect())
    }

    async fn save_strategy(
        &self,
        code: &str,
        params: Option<&StrategyParams>,
    ) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let stored = state
            .stocks
            .get_mut(code)
            .ok_or_else(|| DbError::NotFound(code.to_string()))?;
        stored.strategy = params.cloned();
        Ok(())
    }

    async fn start_run(&self, summary: &RunSummary) -> Result<(), DbError> {
        self.state.write().await.runs.push(summary.clone());
        Ok(())
    }

    async fn finish_run(&self, summary: &RunSummary) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        match state.runs.iter_mut().find(|r| r.run_id == summary.run_id) {
            Some(run) => *run = summary.clone(),
            None => state.runs.push(summary.clone()),
        }
        Ok(())
    }
}
