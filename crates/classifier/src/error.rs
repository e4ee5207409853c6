use indicators::IndicatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfig(String),

    #[error("Indicator computation failed: {0}")]
    Indicator(#[from] IndicatorError),
}
