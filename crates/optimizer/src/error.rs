use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Backtest input error: {0}")]
    Backtest(#[from] backtester::BacktestError),

    #[error("Indicator computation failed: {0}")]
    Indicator(#[from] indicators::IndicatorError),

    #[error("Parameter generation failed: {0}")]
    ParameterGeneration(String),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(String),

    #[error("Optimization interrupted before the grid was exhausted")]
    Interrupted,
}

impl From<rayon::ThreadPoolBuildError> for OptimizerError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        OptimizerError::ThreadPool(error.to_string())
    }
}
