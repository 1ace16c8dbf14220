mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "floorstats")]
#[command(about = "Ingest floorball match protocols and reconcile recorded events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest finished matches that need (re-)processing
    IngestMatches(commands::ingest_matches::IngestMatchesArgs),
    /// Re-ingest under-reported matches within a trailing window
    BackfillScan(commands::backfill_scan::BackfillScanArgs),
    /// Ingest a single match by store id or external id
    IngestMatch(commands::ingest_match::IngestMatchArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("floorstats_lib=info".parse().expect("valid directive"))
                .add_directive("floorstats_cli=info".parse().expect("valid directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<i32> = match &cli.command {
        Commands::IngestMatches(args) => commands::ingest_matches::run(args).await,
        Commands::BackfillScan(args) => commands::backfill_scan::run(args).await,
        Commands::IngestMatch(args) => commands::ingest_match::run(args).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}
