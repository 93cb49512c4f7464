//! Wiring of the monitor components from configuration

use crate::application::clock::{Clock, SystemClock};
use crate::application::lookup::lookup_product;
use crate::application::product_fetcher::{ProductFetcher, RetryPolicy};
use crate::application::product_service::ProductService;
use crate::application::range_monitor::{MonitorSettings, RangeMonitor, SweepReport};
use crate::application::scheduler::MonitorScheduler;
use crate::domain::ProductRecord;
use crate::infrastructure::checkpoint_store::{CheckpointStore, SqliteCheckpointStore};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::notifier::{DiscordWebhookNotifier, EmbedStyle, LogNotifier, ProductNotifier};
use crate::infrastructure::product_cache::{ProductCache, SqliteProductCache};
use crate::infrastructure::product_source::{ProductSource, SlamJamApi};
use crate::infrastructure::proxy::ProxyPool;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Collaborators behind the monitor's trait seams
pub struct Components {
    pub cache: Arc<dyn ProductCache>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub source: Arc<dyn ProductSource>,
    pub notifier: Arc<dyn ProductNotifier>,
    pub clock: Arc<dyn Clock>,
}

/// Fully wired monitor
pub struct MonitorContext {
    config: AppConfig,
    products: Arc<ProductService>,
    monitor: Arc<RangeMonitor>,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
}

impl MonitorContext {
    /// Open the database, load proxies and connect to the live storefront
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let db = DatabaseConnection::new(&config.storage.database_url).await?;
        db.migrate().await.context("Failed to migrate cache database")?;

        let proxies = ProxyPool::load(&config.storage.proxies_path).await?;
        let http = Arc::new(HttpClient::with_proxies(
            HttpClientConfig::from_app_config(&config),
            &proxies,
        )?);
        let source = Arc::new(SlamJamApi::new(&config.http.base_url, http)?);

        let notifier: Arc<dyn ProductNotifier> = match &config.notify.discord_webhook_url {
            Some(url) => {
                info!("📣 Announcing new products on Discord");
                Arc::new(DiscordWebhookNotifier::new(url, EmbedStyle::from(&config.notify))?)
            }
            None => {
                info!("📣 No Discord webhook configured, new products are only logged");
                Arc::new(LogNotifier)
            }
        };

        let components = Components {
            cache: Arc::new(SqliteProductCache::new(db.pool().clone())),
            checkpoints: Arc::new(SqliteCheckpointStore::new(db.pool().clone())),
            source,
            notifier,
            clock: Arc::new(SystemClock),
        };

        Ok(Self::with_components(config, components))
    }

    pub fn with_components(config: AppConfig, components: Components) -> Self {
        let fetcher = Arc::new(ProductFetcher::new(
            components.source,
            RetryPolicy::from_config(&config.monitor),
        ));
        let products = Arc::new(ProductService::new(components.cache.clone(), fetcher));
        let monitor = Arc::new(RangeMonitor::new(
            components.cache,
            products.clone(),
            components.notifier,
            components.clock.clone(),
            MonitorSettings::from_config(&config.monitor),
        ));

        Self {
            config,
            products,
            monitor,
            checkpoints: components.checkpoints,
            clock: components.clock,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn products(&self) -> &Arc<ProductService> {
        &self.products
    }

    pub fn monitor(&self) -> &Arc<RangeMonitor> {
        &self.monitor
    }

    /// Scheduler over the configured range
    pub fn scheduler(&self) -> MonitorScheduler {
        MonitorScheduler::new(
            self.monitor.clone(),
            self.checkpoints.clone(),
            self.clock.clone(),
            (self.config.monitor.start, self.config.monitor.end),
            self.config.monitor.interval(),
        )
    }

    pub async fn lookup(&self, pid: &str) -> Result<Option<ProductRecord>> {
        lookup_product(&self.monitor, &self.products, pid).await
    }

    /// One sweep over an explicit range, outside the schedule
    pub async fn check_range(&self, start: u32, end: u32, cancel: &CancellationToken) -> SweepReport {
        self.monitor.sweep(start, end, cancel).await
    }
}
