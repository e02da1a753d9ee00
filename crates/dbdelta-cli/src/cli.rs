//! dbdelta - compare two SQLite database snapshots

mod logging;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dbdelta_compare::{CompareConfig, Comparator, Comparison, load_comparison_json, save_comparison_json};
use dbdelta_driver_sqlite::SqliteConnection;
use logging::LogFormat;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when some tables could not be compared completely
const EXIT_INCOMPLETE: u8 = 2;

#[derive(Parser)]
#[command(name = "dbdelta")]
#[command(about = "Structured schema and data diffs of two database snapshots")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format written to stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an old snapshot with a new one
    Compare {
        /// Path of the old snapshot
        old: String,

        /// Path of the new snapshot
        new: String,

        /// TOML configuration file
        #[arg(short, long, env = "DBDELTA_CONFIG")]
        config: Option<PathBuf>,

        /// Column matching rows whose primary key was regenerated
        #[arg(long, conflicts_with = "no_stable_id")]
        stable_id: Option<String>,

        /// Match rows by primary key and content only
        #[arg(long)]
        no_stable_id: bool,

        /// Number of tables compared at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Leave a table out of the comparison (repeatable)
        #[arg(long = "ignore-table", value_name = "TABLE")]
        ignore_tables: Vec<String>,

        /// Compare column types ignoring case
        #[arg(long)]
        case_insensitive_types: bool,

        /// Write the full result as JSON to this file
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,

        /// Print every column and row change
        #[arg(long)]
        details: bool,
    },

    /// Print a result saved with `compare --json`
    Show {
        /// Path of the saved result
        path: PathBuf,

        /// Print every column and row change
        #[arg(long)]
        details: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(comparison) if comparison.is_complete() => ExitCode::SUCCESS,
        Ok(comparison) => {
            eprintln!(
                "{} table(s) could not be compared completely",
                comparison.incomplete_tables().count()
            );
            ExitCode::from(EXIT_INCOMPLETE)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<Comparison> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    match cli.command {
        Commands::Compare {
            old,
            new,
            config,
            stable_id,
            no_stable_id,
            concurrency,
            ignore_tables,
            case_insensitive_types,
            json,
            details,
        } => {
            let mut config = match config {
                Some(path) => CompareConfig::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => CompareConfig::default(),
            };
            if let Some(column) = stable_id {
                config = config.with_stable_identifier(column);
            }
            if no_stable_id {
                config = config.without_stable_identifier();
            }
            if let Some(n) = concurrency {
                config = config.with_concurrency(n);
            }
            for table in ignore_tables {
                config = config.ignore_table(table);
            }
            if case_insensitive_types {
                config = config.case_insensitive_types();
            }
            config.validate()?;
            tracing::debug!(?config, "configuration resolved");

            let old_db = SqliteConnection::open(&old)
                .with_context(|| format!("Failed to open old snapshot {}", old))?;
            let new_db = SqliteConnection::open(&new)
                .with_context(|| format!("Failed to open new snapshot {}", new))?;

            let handles = [old_db.cancel_handle(), new_db.cancel_handle()];
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nInterrupted. Cancelling reads...");
                    for handle in &handles {
                        handle.cancel();
                    }
                }
            });

            let result = Comparator::with_config(&old_db, &new_db, config)
                .compare()
                .await;
            interrupt.abort();
            let comparison = result.context("Comparison failed")?;

            if let Some(path) = json {
                save_comparison_json(&comparison, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "result written");
            }
            print_report(&comparison, details);
            Ok(comparison)
        }
        Commands::Show { path, details } => {
            let comparison = load_comparison_json(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            print_report(&comparison, details);
            Ok(comparison)
        }
    }
}

fn print_report(comparison: &Comparison, details: bool) {
    println!("{} -> {}", comparison.source, comparison.target);
    println!("{}", output::summary_table(comparison));
    if details {
        print!("{}", output::details(comparison));
    }
}
