//! poolwatch CLI
//!
//! Runs one pass per invocation; schedule it externally.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use poolwatch::{
    error::Result,
    models::Config,
    pipeline,
    storage::{ListingRepository, LocalRepository},
};

/// poolwatch - Lease Pool Watcher
#[derive(Parser, Debug)]
#[command(
    name = "poolwatch",
    version,
    about = "Announce new vehicles on the lease-pool portal"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one pass: announce and record every new listing
    Run {
        /// Print the pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show listings the next pass would announce
    Pending,

    /// Validate the configuration
    Validate,

    /// Show the processed store
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { json } => {
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let report = pipeline::run_pass(&config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if !report.is_clean() {
                log::warn!(
                    "{} listings not announced, they will be retried on the next pass",
                    report.failures.len()
                );
            }
        }

        Command::Pending => {
            let diff = pipeline::run_pending(&config).await?;
            if !diff.has_unseen() {
                log::info!("No new listings");
            }
            for pending in &diff.unseen {
                println!("{}\t{}", pending.id, pending.reference);
            }
            for reference in &diff.unusable {
                log::warn!("Unusable reference: {}", reference);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }

        Command::Info => {
            let path = config.storage.processed_path();
            let repository = LocalRepository::open(&path).await?;
            let processed = repository.load_processed().await?;
            log::info!("Processed store: {}", path.display());
            log::info!(
                "{} distinct listings in {} entries",
                processed.len(),
                processed.entry_count()
            );
            log::info!("Photos directory: {}", config.storage.photos_dir().display());
        }
    }

    Ok(())
}
