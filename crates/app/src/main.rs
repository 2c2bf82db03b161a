use services::{AppServices, Clock};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod commands;
mod config;

use args::{Parsed, print_usage};
use config::{AppConfig, DEFAULT_LOG_FILTER};

fn init_tracing() {
    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = AppConfig::from_env()
        .and_then(|config| args::parse(std::env::args().skip(1), config))
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    let (command, config) = match parsed {
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
        Parsed::Run { command, config } => (command, config),
    };

    // Open + migrate SQLite in the binary so services stay storage-agnostic.
    config.db.ensure_parent_dir()?;
    let db_url = config.db.url();
    let storage = Storage::sqlite(&db_url).await?;
    tracing::debug!(db = %db_url, ?command, "storage ready");

    let services = AppServices::from_storage(&storage, Clock::system());
    commands::execute(command, &storage, &services).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
