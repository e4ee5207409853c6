use serde::{Deserialize, Serialize};
use std::fmt;

/// Which flavour of the bias strategy the backtester and the signal checker apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    /// Bias thresholds only.
    Plain,
    /// Bias thresholds gated by RSI, plus the early momentum-exhaustion exit.
    #[default]
    RsiFiltered,
}

impl StrategyVariant {
    pub fn uses_rsi(&self) -> bool {
        matches!(self, StrategyVariant::RsiFiltered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyVariant::Plain => "plain",
            StrategyVariant::RsiFiltered => "rsi_filtered",
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyVariant {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(StrategyVariant::Plain),
            "rsi_filtered" => Ok(StrategyVariant::RsiFiltered),
            other => Err(crate::CoreError::InvalidInput(
                "strategy variant".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// The four categories a live signal can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Sell,
    NearBuy,
    NearSell,
}

impl SignalKind {
    /// Returns true for the categories that mean a threshold was actually crossed.
    pub fn is_triggered(&self) -> bool {
        matches!(self, SignalKind::Buy | SignalKind::Sell)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::NearBuy => "NEAR BUY",
            SignalKind::NearSell => "NEAR SELL",
        };
        f.write_str(s)
    }
}
