use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The long-bull grade, e.g. `bull-5y`: a steady uptrend held over that many calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrendLabel(u32);

impl TrendLabel {
    pub const MAX_YEARS: u32 = 5;

    pub fn new(years: u32) -> Result<Self, CoreError> {
        if (1..=Self::MAX_YEARS).contains(&years) {
            Ok(Self(years))
        } else {
            Err(CoreError::InvalidInput(
                "trend label years".to_string(),
                years.to_string(),
            ))
        }
    }

    pub fn years(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bull-{}y", self.0)
    }
}

impl FromStr for TrendLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let years = s
            .strip_prefix("bull-")
            .and_then(|rest| rest.strip_suffix('y'))
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| CoreError::InvalidInput("trend label".to_string(), s.to_string()))?;
        Self::new(years)
    }
}

impl TryFrom<String> for TrendLabel {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrendLabel> for String {
    fn from(label: TrendLabel) -> Self {
        label.to_string()
    }
}

/// The regression statistics of the longest qualifying calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendVerdict {
    pub label: TrendLabel,
    pub period_years: u32,
    pub r_squared: f64,
    pub annualized_return_pct: f64,
    /// Slope of ln(close) against calendar time in years.
    pub slope: f64,
    /// Mean of close x volume over the window.
    pub avg_turnover: f64,
}

/// Why a stock ended up without a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MarketCapBelowFloor,
    NonPositiveRoe,
    EmptyHistory,
    TrendBroken,
    NoQualifyingWindow,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::MarketCapBelowFloor => "market cap missing or below floor",
            RejectReason::NonPositiveRoe => "ROE missing or not positive",
            RejectReason::EmptyHistory => "no valid price history",
            RejectReason::TrendBroken => "dead cross with falling long MA",
            RejectReason::NoQualifyingWindow => "no calendar window qualified",
        };
        f.write_str(s)
    }
}

/// Outcome of one classification pass. Built fresh on every run; never merged with a prior one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Classification {
    Bull(TrendVerdict),
    Unqualified(RejectReason),
}

impl Classification {
    pub fn verdict(&self) -> Option<&TrendVerdict> {
        match self {
            Classification::Bull(v) => Some(v),
            Classification::Unqualified(_) => None,
        }
    }

    pub fn label(&self) -> Option<TrendLabel> {
        self.verdict().map(|v| v.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_text() {
        let label = TrendLabel::new(3).unwrap();
        assert_eq!(label.to_string(), "bull-3y");
        assert_eq!("bull-3y".parse::<TrendLabel>().unwrap(), label);
    }

    #[test]
    fn label_rejects_out_of_range_years() {
        assert!(TrendLabel::new(0).is_err());
        assert!(TrendLabel::new(6).is_err());
        assert!("bull-9y".parse::<TrendLabel>().is_err());
        assert!("long-3y".parse::<TrendLabel>().is_err());
    }

    #[test]
    fn label_serializes_as_string() {
        let json = serde_json::to_string(&TrendLabel::new(5).unwrap()).unwrap();
        assert_eq!(json, "\"bull-5y\"");
    }
}
