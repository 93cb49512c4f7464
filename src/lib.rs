//! SlamJam Monitor - new product detection for the SlamJam storefront
//!
//! Sweeps a range of catalog PIDs on a fixed interval, caches every product
//! it finds and announces products published within the freshness window.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

use anyhow::Result;
use application::MonitorContext;
use infrastructure::{AppConfig, ConfigManager};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Load configuration and start logging; shared by every binary
pub async fn bootstrap() -> Result<AppConfig> {
    let config = ConfigManager::from_env()?.load_config().await?;
    infrastructure::init_logging_with_config(&config.logging)?;
    infrastructure::logging::log_system_info();
    Ok(config)
}

/// Cancel `token` on Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Ctrl-C received, shutting down");
                token.cancel();
            }
            Err(e) => error!("❌ Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Run the scheduler until Ctrl-C
pub async fn run() -> Result<()> {
    let config = bootstrap().await?;
    info!(
        "🚀 Monitoring {}..={} every {}s",
        domain::product_id(config.monitor.start),
        domain::product_id(config.monitor.end),
        config.monitor.interval_seconds
    );

    let context = MonitorContext::from_config(config).await?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    context.scheduler().run(cancel).await
}
