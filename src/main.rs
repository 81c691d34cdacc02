//! Tandem server: presence-driven shared focus sessions.
//!
//! Main entry point that loads configuration, initializes logging,
//! connects the stores and starts the HTTP server.

use tracing_subscriber::{EnvFilter, fmt};

use tandem_core::config::AppConfig;
use tandem_core::error::AppError;
use tandem_database::StoreBackend;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load and validate configuration for `TANDEM_ENV` (default `development`).
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TANDEM_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env)?;
    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?config.database.provider,
        "Starting Tandem"
    );

    let stores = StoreBackend::connect(&config.database).await?;
    tandem_api::run_server(config, stores).await
}
