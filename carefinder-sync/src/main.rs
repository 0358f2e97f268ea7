//! carefinder-sync - provider reconciliation command line
//!
//! Queries the licensing registry for a zip code, reconciles the results with
//! the local provider store, and prints the providers as JSON on stdout.
//! Logs go to stderr.

use anyhow::{Context, Result};
use carefinder_common::config::{self, TomlConfig};
use carefinder_common::logging;
use carefinder_sync::models::FilterSet;
use carefinder_sync::store::{CachedStore, SqliteStore};
use carefinder_sync::{ReconcileOptions, ReconciliationEngine, SyncSettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "carefinder-sync")]
#[command(about = "Child-care provider reconciliation and enrichment")]
#[command(version)]
struct Args {
    /// Config file (defaults to CAREFINDER_CONFIG, then the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG and the config file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile registry results for a zip code and print the providers
    Reconcile {
        #[arg(short, long)]
        zip: String,

        /// Filter key, e.g. `licensed_infant_capacity` or
        /// `provider_service_type.Child Care Center`
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Re-enrich every provider, ignoring stored documents
        #[arg(long)]
        force_refresh: bool,
    },

    /// Print stored providers for a zip code without enrichment
    Lookup {
        #[arg(short, long)]
        zip: String,

        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Print one stored provider
    Show { provider_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let (toml_config, config_source) = config::read_toml_config(config_path.as_deref())?;
    logging::init_logging(&toml_config.logging, args.log_level.as_deref())?;
    config_source.log();

    info!("Starting carefinder-sync {}", env!("CARGO_PKG_VERSION"));

    let db_path = config::database_path(&toml_config.store);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .with_context(|| format!("Failed to open provider store {}", db_path.display()))?,
    );

    match args.command {
        Command::Reconcile {
            zip,
            filters,
            force_refresh,
        } => {
            let filters = FilterSet::from_keys(&filters)?;
            let engine = build_engine(&toml_config, store)?;
            let cancel_token = cancel_on_ctrl_c();

            let providers = engine
                .reconcile(&zip, &filters, ReconcileOptions { force_refresh }, &cancel_token)
                .await?;
            print_json(&providers)?;
        }
        Command::Lookup { zip, filters } => {
            let filters = FilterSet::from_keys(&filters)?;
            let engine = build_engine(&toml_config, store)?;
            let cancel_token = cancel_on_ctrl_c();

            let providers = engine.lookup(&zip, &filters, &cancel_token).await?;
            print_json(&providers)?;
        }
        Command::Show { provider_id } => match store.get(&provider_id).await? {
            Some(provider) => print_json(&provider)?,
            None => anyhow::bail!("No stored provider with id {}", provider_id),
        },
    }

    Ok(())
}

fn build_engine(toml_config: &TomlConfig, store: Arc<SqliteStore>) -> Result<ReconciliationEngine> {
    let google_api_key = config::require_secret(
        config::GOOGLE_API_KEY_ENV_VAR,
        toml_config.google.api_key.as_deref(),
        "Google Maps API key",
    )?;
    let registry_app_token = config::resolve_secret(
        config::REGISTRY_TOKEN_ENV_VAR,
        toml_config.registry.app_token.as_deref(),
        "Registry app token",
    );

    let settings = SyncSettings::from_config(toml_config, google_api_key, registry_app_token);
    info!(cache_dir = %settings.cache_dir.display(), "Static map cache");

    Ok(ReconciliationEngine::from_settings(settings, store)?)
}

/// Token cancelled on the first Ctrl-C; in-flight records still finish
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight providers");
            child.cancel();
        }
    });
    token
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
