use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Unknown pipeline stage: {0}")]
    UnknownStage(String),
}
