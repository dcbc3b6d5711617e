use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curator_core::{
    collection::is_due, load_collection_tree, load_settings, validate_settings, ParsedConfig,
    Settings, SqliteStateStore, StateStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "plan".to_string());

    // Determine settings path
    let settings_path = std::env::var("CURATOR_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("curator.toml"));

    info!("curator {} loading settings from {:?}", VERSION, settings_path);
    let settings = load_settings(&settings_path)
        .with_context(|| format!("Failed to load settings from {:?}", settings_path))?;
    validate_settings(&settings).context("Settings validation failed")?;

    let config = load_collection_tree(&settings.config_dir).with_context(|| {
        format!(
            "Failed to load collection config from {:?}",
            settings.root_config_path()
        )
    })?;
    report_config(&config);

    match command.as_str() {
        "validate" => {
            if !config.errors.is_empty() {
                bail!("{} configuration problems", config.errors.len());
            }
            info!("Configuration is valid");
            Ok(())
        }
        "plan" => plan(&settings, &config),
        other => bail!("Unknown command '{}' (expected 'validate' or 'plan')", other),
    }
}

fn report_config(config: &ParsedConfig) {
    for library in &config.libraries {
        info!(
            "Library '{}' ({}): {} collections",
            library.name,
            library.kind,
            library.collections.len()
        );
        for spec in &library.collections {
            for directive in spec.unsupported_sources() {
                warn!(
                    "Collection '{}': directive '{}' is not supported and will be skipped",
                    spec.name,
                    directive.kind.key()
                );
            }
        }
    }
    for issue in &config.errors {
        warn!("{}", issue);
    }
}

/// Print which collections a run started now would process.
fn plan(settings: &Settings, config: &ParsedConfig) -> Result<()> {
    let state = SqliteStateStore::open_existing(&settings.state.path)
        .with_context(|| format!("Failed to open state at {:?}", settings.state.path))?;
    if state.is_none() {
        info!(
            "No state at {:?}; every scheduled collection counts as never run",
            settings.state.path
        );
    }
    let now = Utc::now();

    let mut entries = Vec::new();
    for library in &config.libraries {
        for spec in &library.collections {
            let last_run = match &state {
                Some(state) => state
                    .last_run(&library.name, &spec.name)
                    .with_context(|| format!("Failed to read last run of '{}'", spec.name))?,
                None => None,
            };
            let due = settings.sync.ignore_schedule || is_due(spec.schedule, last_run, now);
            entries.push(json!({
                "library": library.name,
                "collection": spec.name,
                "schedule": spec.schedule.to_string(),
                "sync_mode": spec.sync_mode,
                "sources": spec.sources.len(),
                "last_run": last_run,
                "due": due,
            }));
        }
    }

    let due = entries.iter().filter(|e| e["due"] == true).count();
    info!(
        "{} of {} collections due{}",
        due,
        entries.len(),
        if settings.sync.dry_run { " (dry run)" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
