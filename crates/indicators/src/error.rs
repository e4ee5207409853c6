use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Indicator window must be positive, got {0}")]
    InvalidWindow(usize),

    #[error("Technical analysis library error: {0}")]
    Ta(String),
}

impl From<ta::errors::TaError> for IndicatorError {
    fn from(error: ta::errors::TaError) -> Self {
        IndicatorError::Ta(format!("{:?}", error))
    }
}
