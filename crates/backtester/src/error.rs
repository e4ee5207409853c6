use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
}
