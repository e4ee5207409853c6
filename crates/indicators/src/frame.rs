use crate::{IndicatorError, bias_series, rsi, sma};

/// Which indicators a frame materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub short_window: usize,
    pub long_window: usize,
    /// `None` skips the RSI column entirely.
    pub rsi_period: Option<usize>,
}

/// Close prices with their short/long MA bias ratios and optional RSI, one row per bar.
///
/// All columns are computed over the full input so the leading rows are `None` until each
/// indicator has enough history.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub close: Vec<f64>,
    pub short_ma: Vec<Option<f64>>,
    pub long_ma: Vec<Option<f64>>,
    pub short_bias: Vec<Option<f64>>,
    pub long_bias: Vec<Option<f64>>,
    pub rsi: Option<Vec<Option<f64>>>,
}

impl IndicatorFrame {
    pub fn compute(closes: &[f64], spec: FrameSpec) -> Result<Self, IndicatorError> {
        let short_ma = sma(closes, spec.short_window)?;
        let long_ma = sma(closes, spec.long_window)?;
        let short_bias = bias_series(closes, &short_ma);
        let long_bias = bias_series(closes, &long_ma);
        let rsi = spec.rsi_period.map(|p| rsi(closes, p)).transpose()?;

        Ok(Self {
            close: closes.to_vec(),
            short_ma,
            long_ma,
            short_bias,
            long_bias,
            rsi,
        })
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// RSI at row `i`, if the column exists and is warmed up.
    pub fn rsi_at(&self, i: usize) -> Option<f64> {
        self.rsi.as_ref().and_then(|col| col.get(i).copied().flatten())
    }

    /// True when every materialized indicator has a value at row `i`.
    pub fn is_complete(&self, i: usize) -> bool {
        let rsi_ok = match &self.rsi {
            Some(col) => col.get(i).is_some_and(Option::is_some),
            None => true,
        };
        i < self.len() && self.short_bias[i].is_some() && self.long_bias[i].is_some() && rsi_ok
    }

    /// Indices at or after `start` whose indicators are all present.
    pub fn complete_rows_from(&self, start: usize) -> Vec<usize> {
        (start..self.len()).filter(|&i| self.is_complete(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_marks_warm_up_rows_incomplete() {
        let closes: Vec<f64> = (1..=40).map(|v| 10.0 + v as f64 * 0.1).collect();
        let frame = IndicatorFrame::compute(
            &closes,
            FrameSpec {
                short_window: 5,
                long_window: 20,
                rsi_period: Some(14),
            },
        )
        .unwrap();

        assert_eq!(frame.len(), 40);
        assert!(!frame.is_complete(18));
        assert!(frame.is_complete(19));
        assert_eq!(frame.complete_rows_from(30).len(), 10);
        assert_eq!(frame.rsi_at(39), Some(100.0));
    }

    #[test]
    fn frame_without_rsi_ignores_that_column() {
        let closes = vec![5.0; 10];
        let frame = IndicatorFrame::compute(
            &closes,
            FrameSpec {
                short_window: 2,
                long_window: 3,
                rsi_period: None,
            },
        )
        .unwrap();

        assert!(frame.is_complete(2));
        assert_eq!(frame.long_bias[2], Some(0.0));
        assert_eq!(frame.rsi_at(5), None);
    }
}
