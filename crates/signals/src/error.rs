use indicators::IndicatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Indicator computation failed: {0}")]
    Indicator(#[from] IndicatorError),
}
