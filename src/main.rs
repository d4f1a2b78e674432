//! Web Tester server.
//!
//! Entry point: loads configuration, installs logging and serves the app.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tracing::info;

use web_tester::config::AppConfig;
use web_tester::server::start_server;
use web_tester::telemetry;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init(config.logging.json);

    info!(
        name: "config.loaded",
        address = %config.bind_address(),
        prefs_path = %config.storage.prefs_path.display(),
        static_dir = %config.server.static_dir.display(),
        "Configuration loaded"
    );

    start_server(Arc::new(config)).await
}
