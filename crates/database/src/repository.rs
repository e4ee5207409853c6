use crate::error::DbError;
use async_trait::async_trait;
use core_types::{PricePoint, StockListing, StockSnapshot, StrategyParams, TrendVerdict};
use events::RunSummary;
use serde::Serialize;

/// A labeled stock together with whatever strategy is currently stored for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledStock {
    pub listing: StockListing,
    pub verdict: TrendVerdict,
    pub strategy: Option<StrategyParams>,
}

/// The storage contract the pipeline works against.
///
/// Verdicts and strategies have replace-or-clear semantics: saving `Some` fully replaces the
/// stored record, saving `None` deletes it. Nothing is ever merged with a prior value.
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// The whole stock universe, ordered by code.
    async fn list_stocks(&self) -> Result<Vec<StockListing>, DbError>;

    /// Full history plus fundamentals for one stock.
    async fn load_snapshot(&self, code: &str) -> Result<StockSnapshot, DbError>;

    /// The most recent `bars` bars of a stock, oldest first.
    async fn load_recent_history(&self, code: &str, bars: usize)
    -> Result<Vec<PricePoint>, DbError>;

    /// Inserts or refreshes a stock, its fundamentals and its bars (bars upserted by date).
    async fn upsert_stock(&self, snapshot: &StockSnapshot) -> Result<(), DbError>;

    async fn save_verdict(&self, code: &str, verdict: Option<&TrendVerdict>)
    -> Result<(), DbError>;

    /// Every stock currently holding a label, ordered by code.
    async fn list_labeled(&self) -> Result<Vec<LabeledStock>, DbError>;

    async fn save_strategy(
        &self,
        code: &str,
        params: Option<&StrategyParams>,
    ) -> Result<(), DbError>;

    async fn start_run(&self, summary: &RunSummary) -> Result<(), DbError>;

    async fn finish_run(&self, summary: &RunSummary) -> Result<(), DbError>;
}

fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// The precision verdicts are stored at: r² 4 dp, annual return 2 dp, slope 6 dp,
/// turnover in whole HKD.
pub fn stored_verdict(verdict: &TrendVerdict) -> TrendVerdict {
    TrendVerdict {
        r_squared: round_to(verdict.r_squared, 4),
        annualized_return_pct: round_to(verdict.annualized_return_pct, 2),
        slope: round_to(verdict.slope, 6),
        avg_turnover: round_to(verdict.avg_turnover, 0),
        ..*verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::TrendLabel;

    #[test]
    fn verdict_is_rounded_for_storage() {
        let verdict = TrendVerdict {
            label: TrendLabel::new(2).unwrap(),
            period_years: 2,
            r_squared: 0.912_345_6,
            annualized_return_pct: 23.456_7,
            slope: 0.210_987_654,
            avg_turnover: 81_234_567.89,
        };
        let stored = stored_verdict(&verdict);
        assert_eq!(stored.r_squared, 0.9123);
        assert_eq!(stored.annualized_return_pct, 23.46);
        assert_eq!(stored.slope, 0.210988);
        assert_eq!(stored.avg_turnover, 81_234_568.0);
        assert_eq!(stored.label, verdict.label);
    }
}
