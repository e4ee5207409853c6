//! JSON ingestion: the only place raw market records become [`PricePoint`]s.
//!
//! The import file is a JSON array of stocks:
//!
//! ```json
//! [{"code": "00700", "name": "Tencent",
//!   "fundamentals": {"market_cap": 3.5e12, "roe_pct": 21.4},
//!   "history": [{"date": "2024-03-01", "open": 300.0, "high": 305.0,
//!                "low": 298.0, "close": 303.2, "volume": 1.2e7}]}]
//! ```

use crate::error::DbError;
use crate::repository::StockRepository;
use chrono::NaiveDate;
use core_types::{Fundamentals, PricePoint, PriceSeries, StockSnapshot};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawBar {
    date: NaiveDate,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl RawBar {
    /// Bars without a close are unusable. Missing open/high/low fall back to the close.
    fn into_point(self) -> Option<PricePoint> {
        let close = self.close?;
        Some(PricePoint {
            date: self.date,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
            volume: self.volume.filter(|v| v.is_finite()).unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawStock {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    fundamentals: Fundamentals,
    #[serde(default)]
    history: Vec<RawBar>,
}

impl RawStock {
    fn into_snapshot(self) -> StockSnapshot {
        let points = self.history.into_iter().filter_map(RawBar::into_point).collect();
        let series = PriceSeries::new(self.code.clone(), points);
        let name = if self.name.is_empty() {
            self.code.clone()
        } else {
            self.name
        };
        StockSnapshot {
            code: self.code,
            name,
            fundamentals: self.fundamentals,
            history: series.points().to_vec(),
        }
    }
}

/// Parses and normalizes an import document.
///
/// Bars are sorted by date, non-positive or non-finite closes are dropped, the last record of
/// a duplicated date wins and a missing volume becomes 0.
pub fn parse_snapshots(json: &str) -> Result<Vec<StockSnapshot>, DbError> {
    let raw: Vec<RawStock> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(RawStock::into_snapshot).collect())
}

pub async fn read_snapshots(path: impl AsRef<Path>) -> Result<Vec<StockSnapshot>, DbError> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_snapshots(&text)
}

/// Upserts every snapshot into the repository, returning how many were written.
pub async fn import_snapshots(
    repo: &dyn StockRepository,
    snapshots: &[StockSnapshot],
) -> Result<usize, DbError> {
    for snapshot in snapshots {
        repo.upsert_stock(snapshot).await?;
    }
    tracing::info!(stocks = snapshots.len(), "Imported stock snapshots");
    Ok(snapshots.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_history_on_import() {
        let json = r#"[
            {"code": "00700", "name": "Tencent",
             "fundamentals": {"market_cap": 3.5e12, "roe_pct": 21.4},
             "history": [
                {"date": "2024-03-04", "open": 301.0, "high": 306.0, "low": 300.0, "close": 305.0, "volume": 900.0},
                {"date": "2024-03-01", "open": 300.0, "high": 305.0, "low": 298.0, "close": 303.2},
                {"date": "2024-03-02", "close": -1.0, "volume": 10.0},
                {"date": "2024-03-03", "volume": 10.0},
                {"date": "2024-03-04", "open": 301.0, "high": 307.0, "low": 300.0, "close": 306.5, "volume": 950.0}
             ]}
        ]"#;

        let snapshots = parse_snapshots(json).unwrap();
        assert_eq!(snapshots.len(), 1);
        let history = &snapshots[0].history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(history[0].volume, 0.0);
        assert_eq!(history[1].close, 306.5);
        assert_eq!(snapshots[0].fundamentals.roe_pct, Some(21.4));
    }

    #[test]
    fn missing_fundamentals_and_name_are_tolerated() {
        let snapshots = parse_snapshots(r#"[{"code": "00005"}]"#).unwrap();
        assert_eq!(snapshots[0].name, "00005");
        assert_eq!(snapshots[0].fundamentals, Fundamentals::default());
        assert!(snapshots[0].history.is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            parse_snapshots(r#"{"code": "00005"}"#),
            Err(DbError::JsonError(_))
        ));
    }
}
