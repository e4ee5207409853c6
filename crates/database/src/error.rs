use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection is not configured: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is inconsistent: {0}")]
    InvalidData(#[from] core_types::CoreError),

    #[error("Stock '{0}' was not found in the database.")]
    NotFound(String),
}
