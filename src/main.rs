#![deny(clippy::all)]

mod app;
mod auth;
mod client;
mod console;
mod desktop;
mod drafts;
mod error;
mod export;
mod history;
mod preferences;
mod session;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// Re-export error types (used by other modules)
#[allow(unused_imports)]
pub use error::*;

/// Environment variable overriding the service base URL
const SERVICE_URL_ENV: &str = "FOLLOWUP_SERVICE_URL";

/// Application configuration
#[derive(serde::Deserialize)]
struct Config {
    service: ServiceConfig,
    export: ExportConfig,
}

#[derive(serde::Deserialize)]
struct ServiceConfig {
    base_url: String,
    request_timeout_secs: u64,
    connect_timeout_secs: u64,
}

#[derive(serde::Deserialize)]
struct ExportConfig {
    default_subject: String,
}

/// Load configuration from embedded config.toml
fn load_config() -> Result<Config, AppError> {
    const CONFIG_TOML: &str = include_str!("../config.toml");
    let mut config: Config =
        toml::from_str(CONFIG_TOML).map_err(|e| AppError::Config(e.to_string()))?;

    if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
        if !url.trim().is_empty() {
            info!("Using service URL from {}", SERVICE_URL_ENV);
            config.service.base_url = url.trim().to_string();
        }
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the console view
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let config = load_config()?;
    info!("Meeting service at {}", config.service.base_url);

    let store = preferences::PreferencesStore::open_default()?;
    info!("Preferences at {}", store.path().display());
    let auth = auth::AuthGate::restore(store);
    if let Some(identity) = auth.identity() {
        info!("Restored session for {}", identity);
    }

    let service = client::HttpMeetingClient::new(
        &config.service.base_url,
        client::ClientTimeouts {
            request: Duration::from_secs(config.service.request_timeout_secs),
            connect: Duration::from_secs(config.service.connect_timeout_secs),
        },
    )?;
    let export = export::ExportAdapter::new(
        config.export.default_subject,
        Arc::new(desktop::SystemDesktop),
    );

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let input = tokio::spawn(console::read_input(tx.clone()));

    let app = app::App::new(auth, Arc::new(service), export, tx);
    app.run(rx, console::render).await;

    input.abort();
    info!("Goodbye");

    // A pending stdin read holds a blocking thread that would stall runtime shutdown
    std::process::exit(0);
}
