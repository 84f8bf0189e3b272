//! enquiry-ledger - enquiry pipeline analytics and payment ledger

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use enquiry_ledger::IntakeService;
use enquiry_ledger::config::{AnalyticsConfig, LogFormat};
use enquiry_ledger::db::memory::MemoryBackend;
use enquiry_ledger::settings::Settings;

mod cli;

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("enquiry_ledger=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);

    // Reports go to stdout, so logs stay on stderr.
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = cli::Cli::parse();

    let settings = Settings::load_or_default(cli.settings.as_deref())?;
    let config = AnalyticsConfig::resolve(&settings)?;
    init_logging(config.log_format);

    let snapshot_path = cli.snapshot.clone().or_else(|| config.snapshot_path.clone());
    let backend = match &snapshot_path {
        Some(path) => {
            let backend = MemoryBackend::from_snapshot_file(&config.enquiry_id_prefix, path)
                .await
                .with_context(|| format!("failed to load snapshot {}", path.display()))?;
            tracing::info!(path = %path.display(), "Loaded snapshot");
            backend
        }
        None => {
            tracing::warn!("No snapshot configured; reporting over an empty store");
            MemoryBackend::new(&config.enquiry_id_prefix)
        }
    };

    let service = IntakeService::new(Arc::new(backend));
    let report = cli::run(&cli, &service, &config).await?;
    print!("{report}");
    Ok(())
}
