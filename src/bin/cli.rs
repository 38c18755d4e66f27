//! towerdex CLI
//!
//! Local execution entry point for catalog synchronization.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use towerdex::{
    error::Result,
    models::{AllowLists, Config},
    pipeline::{CatalogSync, SyncOptions},
    services::pool::{ProgressEvent, ProgressFn, SyncPhase},
    storage::JsonFileStore,
};

/// towerdex - Community Tower Catalog
#[derive(Parser, Debug)]
#[command(name = "towerdex", version, about = "Community tower catalog synchronizer")]
struct Cli {
    /// Path to the data directory containing config files and the cache
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize the catalog from the wiki
    Sync {
        /// Skip the cached snapshot and refetch everything
        #[arg(long)]
        force: bool,

        /// Number of concurrent enrichment workers
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Validate configuration and registry files
    Validate,

    /// Show current snapshot info
    Info,

    /// Drop the cached snapshot
    Clear,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_engine(data_dir: &PathBuf) -> (Arc<Config>, CatalogSync) {
    let config = Arc::new(Config::load_or_default(data_dir.join("config.toml")));
    let registries = AllowLists::load_or_default(data_dir.join("registries.toml"));
    let store = JsonFileStore::new(data_dir.join("cache"));
    let engine = CatalogSync::new(Arc::clone(&config), registries, Box::new(store));
    (config, engine)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (config, engine) = build_engine(&cli.data_dir);

    match cli.command {
        Command::Sync { force, concurrency } => {
            let options = SyncOptions {
                force_refresh: force,
                concurrency,
            };

            let reporter: &ProgressFn = &|event: &ProgressEvent| match event.phase {
                SyncPhase::List => {
                    log::info!("Found {} entries, fetching sub-pages...", event.total);
                }
                SyncPhase::Enrich => {
                    let name = event
                        .entry
                        .as_ref()
                        .map(|e| e.name.as_str())
                        .unwrap_or("?");
                    match &event.error {
                        Some(error) => log::warn!(
                            "[{}/{}] {} (partial: {})",
                            event.completed,
                            event.total,
                            name,
                            error
                        ),
                        None => log::info!("[{}/{}] {}", event.completed, event.total, name),
                    }
                }
            };

            let entries = engine.synchronize(&options, Some(reporter)).await?;

            let verified = entries.iter().filter(|e| e.verified).count();
            let with_payload = entries.iter().filter(|e| e.payload.is_some()).count();
            log::info!(
                "Catalog ready: {} entries ({} verified, {} with payload)",
                entries.len(),
                verified,
                with_payload
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK ({} proxy endpoints)", config.proxy.endpoints.len());

            let registries = AllowLists::load_or_default(cli.data_dir.join("registries.toml"));
            log::info!(
                "✓ Registries OK ({} approved, {} featured, {} grandfathered, {} highlights)",
                registries.approved.len(),
                registries.featured.len(),
                registries.grandfathered.len(),
                registries.highlights.len()
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Data directory: {}", cli.data_dir.display());
            match engine.cache().read().await {
                Some(snapshot) => {
                    log::info!("Cached snapshot: {} entries", snapshot.count);
                    log::info!("Captured at: {}", snapshot.captured_at);
                }
                None => log::info!("No fresh snapshot; next sync will hit the network."),
            }
        }

        Command::Clear => {
            engine.cache().clear().await?;
            log::info!("Cached snapshot dropped.");
        }
    }

    Ok(())
}
