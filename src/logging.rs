use configuration::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: console output routed through the progress-bar layer and a
/// daily-rolling plain-text file.
///
/// `RUST_LOG` overrides the configured level. Keep the returned guard alive until exit or
/// buffered file output is lost.
pub fn init(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let indicatif_layer = IndicatifLayer::new();
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(indicatif_layer)
        .try_init()?;

    Ok(guard)
}
