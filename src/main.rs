use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use classflow::config::AppConfig;
use classflow::error::AppError;
use classflow::storage::CsvTable;
use classflow::telemetry;
use classflow::workflows::registration::notify::ConsoleNotifier;
use classflow::workflows::registration::{CatalogSync, RunOrchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "classflow",
    about = "Reconcile class-registration submissions against capacity-bounded rosters",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay all form responses through the placement engine and persist the results
    Run(RunArgs),
    /// Import new classes and teachers from the class catalog sheet
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Override the configured ledger directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override the default per-class seat cap
    #[arg(long)]
    capacity: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct CatalogArgs {
    /// Override the configured ledger directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(config.environment, &config.telemetry)?;

    match cli.command {
        Command::Run(args) => {
            let data_dir = args
                .data_dir
                .unwrap_or_else(|| config.registration.data_dir.clone());
            let capacity = args
                .capacity
                .unwrap_or(config.registration.default_capacity);
            info!(data_dir = %data_dir.display(), capacity, "starting reconciliation run");

            let table = Arc::new(CsvTable::new(data_dir));
            let orchestrator = RunOrchestrator::new(table, Arc::new(ConsoleNotifier), capacity);
            let summary = orchestrator.execute()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_else(|_| format!("{summary:?}"))
            );
        }
        Command::Catalog(args) => {
            let data_dir = args
                .data_dir
                .unwrap_or_else(|| config.registration.data_dir.clone());
            info!(data_dir = %data_dir.display(), "starting catalog sync");

            let table = Arc::new(CsvTable::new(data_dir));
            let sync = CatalogSync::new(table, config.registration.default_capacity);
            let report = sync.sync()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).unwrap_or_else(|_| format!("{report:?}"))
            );
        }
    }

    Ok(())
}
