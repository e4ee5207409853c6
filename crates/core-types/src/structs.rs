use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar, forward-adjusted (QFQ).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// A bar is usable only when its close is a strictly positive, finite number.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    /// Estimated traded amount for the day (close x volume).
    pub fn turnover(&self) -> f64 {
        self.close * self.volume
    }
}

/// Static fundamentals snapshot used by the classifier's pre-gates.
///
/// Either figure may be missing upstream; a missing value fails its gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Total market capitalisation in HKD.
    pub market_cap: Option<f64>,
    /// Return on equity, in percent.
    pub roe_pct: Option<f64>,
}

/// Identity of a stock in the universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockListing {
    pub code: String,
    pub name: String,
}

/// Everything a worker needs to evaluate one stock, with no references back into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub fundamentals: Fundamentals,
    pub history: Vec<PricePoint>,
}

impl StockSnapshot {
    pub fn listing(&self) -> StockListing {
        StockListing {
            code: self.code.clone(),
            name: self.name.clone(),
        }
    }
}
