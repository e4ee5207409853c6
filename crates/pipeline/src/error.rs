use thiserror::Error;

/// Errors that abort a whole stage. Per-stock failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] classifier::ClassifierError),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] optimizer::OptimizerError),
}
