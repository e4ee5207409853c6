use crate::error::DbError;
use configuration::DatabaseConfig;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL comes from the configuration, where `DATABASE_URL` has already been applied as an
/// override. The pool is shared across the entire application.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let database_url = config.url.as_deref().ok_or_else(|| {
        DbError::ConnectionConfigError("DATABASE_URL or database.url must be set.".to_string())
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
