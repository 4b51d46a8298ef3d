//! Roster CLI - Command line interface for the reviewer assignment engine
//!
//! Assigns pull request reviewers within teams and keeps assignments valid
//! as members come and go.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use roster_core::{Config, ReviewService};
use roster_db::{DatabaseConfig, SqliteStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Context, PrArgs, StatsArgs, TeamArgs, UserArgs};

/// Roster: pull request reviewer assignment
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the SQLite database (overrides config and env)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Seed for reproducible reviewer selection (overrides config and env)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage teams and deactivate them
    #[command(visible_alias = "t")]
    Team(TeamArgs),

    /// Manage users and their review queues
    #[command(visible_alias = "u")]
    User(UserArgs),

    /// Create, merge and reassign pull requests
    Pr(PrArgs),

    /// Show assignment statistics
    Stats(StatsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.db.clone(), cli.seed)?;

    if cli.verbose {
        tracing::info!(
            db_path = %config.database.path.display(),
            seed = ?config.selection.seed,
            "Configuration loaded"
        );
    }

    let command = match cli.command {
        Some(Commands::Version) => {
            println!("roster {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(Commands::Config) => {
            print_config(&config);
            return Ok(());
        }
        None => {
            println!("Roster - pull request reviewer assignment");
            println!();
            println!("Use --help for usage information");
            return Ok(());
        }
        Some(command) => command,
    };

    let store = SqliteStore::connect(DatabaseConfig::from(&config.database))
        .await
        .map_err(roster_core::Error::from)?;
    let service = ReviewService::new(store, config.service.clone())
        .with_random_source(config.selection.random_source());
    let ctx = Context {
        service,
        json: cli.json,
    };

    match command {
        Commands::Team(args) => args.execute(&ctx).await,
        Commands::User(args) => args.execute(&ctx).await,
        Commands::Pr(args) => args.execute(&ctx).await,
        Commands::Stats(args) => args.execute(&ctx).await,
        Commands::Version | Commands::Config => Ok(()),
    }
}

fn print_config(config: &Config) {
    println!("Roster Configuration");
    println!("====================");
    println!();
    println!("Database:");
    println!("  path: {}", config.database.path.display());
    println!("  max_connections: {}", config.database.max_connections);
    println!("  busy_timeout: {:?}", config.database.busy_timeout);
    println!();
    println!("Service:");
    println!("  max_conflict_retries: {}", config.service.max_conflict_retries);
    println!();
    println!("Selection:");
    match config.selection.seed {
        Some(seed) => println!("  seed: {}", seed),
        None => println!("  seed: (random)"),
    }
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
