use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod optimizer_config;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use optimizer_config::{GridRange, StrategyConfig};
pub use settings::{
    BatchConfig, Config, DatabaseConfig, LoggingConfig, NotifierConfig, SignalConfig, TrendConfig,
    WorkerConfig,
};

/// Prefix of environment variables that override file settings,
/// e.g. `LONGBULL__STRATEGY__COMMISSION=0.001`.
pub const ENV_PREFIX: &str = "LONGBULL";

/// Loads the application configuration from `config.toml` (optional) and the environment.
///
/// The result is validated before it is returned. `DATABASE_URL`, if present in the
/// environment or a `.env` file, takes precedence over `database.url`.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Same as [`load_config`] but reading the given file path.
pub fn load_config_from(path: &str) -> Result<Config, ConfigError> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();

    let builder = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let mut config = builder.try_deserialize::<Config>()?;

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = Some(url);
    }

    config.validate()?;
    tracing::debug!(path, "Configuration loaded");
    Ok(config)
}

/// Parses configuration from TOML text, applying the same defaults and validation.
pub fn config_from_toml(text: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(text, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::StrategyVariant;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let cfg = config_from_toml(
            r#"
            [trend]
            min_r_squared = 0.9
            max_annual_return_pct = 60.0

            [strategy]
            variant = "plain"
            buy_range = { start = -0.10, end = 0.02, step = 0.005 }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.trend.min_r_squared, 0.9);
        assert_eq!(cfg.trend.max_annual_return_pct, 60.0);
        assert_eq!(cfg.trend.long_ma_window, 250);
        assert_eq!(cfg.strategy.variant, StrategyVariant::Plain);
        assert_eq!(cfg.strategy.buy_range.len(), 25);
        assert_eq!(cfg.strategy.sell_range.len(), 76);
        assert_eq!(cfg.workers.max_workers, 4);
    }

    #[test]
    fn invalid_values_are_rejected_at_load() {
        let err = config_from_toml("[workers]\nmax_workers = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
