use crate::error::BacktestError;
use indicators::IndicatorFrame;

/// Contiguous, pre-materialized columns for the kernel. Every row is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestInputs {
    close: Vec<f64>,
    short_bias: Vec<f64>,
    long_bias: Vec<f64>,
    rsi: Option<Vec<f64>>,
}

impl BacktestInputs {
    pub fn new(
        close: Vec<f64>,
        short_bias: Vec<f64>,
        long_bias: Vec<f64>,
        rsi: Option<Vec<f64>>,
    ) -> Result<Self, BacktestError> {
        let expected = close.len();
        let check = |column: &'static str, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(BacktestError::LengthMismatch {
                    column,
                    expected,
                    actual,
                })
            }
        };
        check("short_bias", short_bias.len())?;
        check("long_bias", long_bias.len())?;
        if let Some(rsi) = &rsi {
            check("rsi", rsi.len())?;
        }

        Ok(Self {
            close,
            short_bias,
            long_bias,
            rsi,
        })
    }

    /// Copies the complete rows of `frame` at or after `start` into contiguous columns.
    /// Rows missing any materialized indicator are dropped.
    pub fn from_frame(frame: &IndicatorFrame, start: usize) -> Self {
        let rows = frame.complete_rows_from(start);
        // `complete_rows_from` only yields rows where every column below is `Some`.
        let pick = |col: &[Option<f64>]| -> Vec<f64> {
            rows.iter().filter_map(|&i| col[i]).collect()
        };

        Self {
            close: rows.iter().map(|&i| frame.close[i]).collect(),
            short_bias: pick(&frame.short_bias),
            long_bias: pick(&frame.long_bias),
            rsi: frame.rsi.as_deref().map(pick),
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn short_bias(&self) -> &[f64] {
        &self.short_bias
    }

    pub fn long_bias(&self) -> &[f64] {
        &self.long_bias
    }

    pub fn rsi(&self) -> Option<&[f64]> {
        self.rsi.as_deref()
    }
}
