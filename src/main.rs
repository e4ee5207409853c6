use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use configuration::Config;
use database::{
    InMemoryRepository, PgRepository, StockRepository, connect, import_snapshots, read_snapshots,
    run_migrations,
};
use pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod logging;
mod progress;
mod table;

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Long-bull trend screening, bias-strategy optimization and daily signals for HK stocks.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (optional; environment variables override it).
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    /// Work against an in-memory store seeded from this JSON file instead of PostgreSQL.
    /// Nothing is saved; stages that store results print the labeled stocks instead.
    #[arg(long, global = true)]
    offline: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import stock snapshots (fundamentals and daily bars) from a JSON file.
    Import(ImportArgs),
    /// Grade every stock's long-bull trend.
    Classify,
    /// Optimize bias thresholds for every labeled stock.
    Optimize,
    /// Check today's signals and notify.
    Signals(AsOfArgs),
    /// Classify, optimize and check signals in one go.
    Run(AsOfArgs),
    /// Explain every classification gate for one stock.
    Diagnose(DiagnoseArgs),
    /// Show labeled stocks and their optimized parameters.
    Report,
}

#[derive(Parser)]
struct ImportArgs {
    /// Path to the JSON file.
    #[arg(long)]
    file: PathBuf,
}

#[derive(Parser)]
struct AsOfArgs {
    /// Evaluate freshness against this date instead of today (format: YYYY-MM-DD).
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Parser)]
struct DiagnoseArgs {
    /// Stock code, e.g. "00700".
    #[arg(long)]
    code: String,

    /// Only use bars up to this date (format: YYYY-MM-DD).
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

/// The main entry point for the long-bull analysis application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = configuration::load_config_from(&cli.config).context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    let repo = open_repository(&config, cli.offline.as_ref()).await?;
    let offline = cli.offline.is_some();

    match cli.command {
        Commands::Import(args) => handle_import(args, repo.as_ref()).await,
        Commands::Report => handle_report(repo.as_ref()).await,
        command => handle_pipeline(command, config, repo, offline).await,
    }
}

/// An offline store is dropped on exit, so stages that write to it show what they stored.
fn shows_results(command: &Commands, offline: bool) -> bool {
    offline && matches!(command, Commands::Classify | Commands::Optimize | Commands::Run(_))
}

async fn open_repository(
    config: &Config,
    offline: Option<&PathBuf>,
) -> anyhow::Result<Arc<dyn StockRepository>> {
    if let Some(path) = offline {
        let snapshots = read_snapshots(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        info!(stocks = snapshots.len(), "Using in-memory store");
        return Ok(Arc::new(InMemoryRepository::with_snapshots(snapshots)));
    }

    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(Arc::new(PgRepository::new(pool)))
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_import(args: ImportArgs, repo: &dyn StockRepository) -> anyhow::Result<()> {
    let snapshots = read_snapshots(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let imported = import_snapshots(repo, &snapshots).await?;
    println!("Imported {} stocks from {}", imported, args.file.display());
    Ok(())
}

async fn handle_report(repo: &dyn StockRepository) -> anyhow::Result<()> {
    let labeled = repo.list_labeled().await?;
    if labeled.is_empty() {
        println!("No labeled stocks yet. Run `classify` first.");
        return Ok(());
    }
    println!("{}", table::labeled_stocks(&labeled));
    Ok(())
}

/// Runs the stage commands, with Ctrl-C wired to the pipeline's cancellation token.
async fn handle_pipeline(
    command: Commands,
    config: Config,
    repo: Arc<dyn StockRepository>,
    offline: bool,
) -> anyhow::Result<()> {
    let show_results = shows_results(&command, offline);
    let sink = alerter::sink_from_config(&config.notifier);
    let cancel = CancellationToken::new();
    let pipeline = Pipeline::new(config, repo, sink)?.with_cancel_token(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested; finishing the stocks in flight.");
            cancel.cancel();
        }
    });
    let progress = progress::spawn(pipeline.reporter().subscribe());
    let today = chrono::Local::now().date_naive();

    let result = match command {
        Commands::Classify => pipeline.classify_all().await.map(|s| {
            println!("{}: {} labeled, {} cleared", s.status, s.updated, s.cleared);
        }),
        Commands::Optimize => pipeline.optimize_all().await.map(|s| {
            println!(
                "{}: {} optimized, {} without result, {} failed",
                s.status, s.updated, s.cleared, s.failed
            );
        }),
        Commands::Signals(args) => pipeline
            .check_signals(args.as_of.unwrap_or(today))
            .await
            .map(|run| println!("{} signal(s) found", run.report.hits.len())),
        Commands::Run(args) => pipeline
            .run_all(args.as_of.unwrap_or(today))
            .await
            .map(|report| {
                for stage in &report.stages {
                    println!(
                        "{:<9} {:<10} processed {:>5}  updated {:>5}  cleared {:>5}  failed {:>3}",
                        stage.stage.as_str(),
                        stage.status.as_str(),
                        stage.processed,
                        stage.updated,
                        stage.cleared,
                        stage.failed
                    );
                }
            }),
        Commands::Diagnose(args) => pipeline
            .diagnose(&args.code, args.as_of)
            .await
            .map(|diagnosis| println!("{}", diagnosis)),
        Commands::Import(_) | Commands::Report => Ok(()),
    };

    progress.abort();
    result?;
    if show_results {
        handle_report(pipeline.repository().as_ref()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_stages_that_store_results_print_them() {
        assert!(shows_results(&Commands::Classify, true));
        assert!(shows_results(&Commands::Optimize, true));
        assert!(shows_results(&Commands::Run(AsOfArgs { as_of: None }), true));
        assert!(!shows_results(&Commands::Signals(AsOfArgs { as_of: None }), true));
        assert!(!shows_results(&Commands::Classify, false));
    }

    #[test]
    fn offline_flag_is_global() {
        let cli = Cli::try_parse_from(["longbull", "classify", "--offline", "stocks.json"]).unwrap();
        assert_eq!(cli.offline, Some(PathBuf::from("stocks.json")));
        assert!(matches!(cli.command, Commands::Classify));
    }
}
