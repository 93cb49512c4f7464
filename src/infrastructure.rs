//! Infrastructure layer for storage, HTTP, parsing, and external integrations
//!
//! This module provides the sqlite cache and checkpoint store, the proxied
//! storefront client with its two response parsers, notification channels,
//! configuration and logging.

pub mod checkpoint_store;
pub mod config;
pub mod database_connection;
pub mod fetch_error;
pub mod http_client;
pub mod logging;
pub mod notifier;
pub mod parsing;
pub mod parsing_error;
pub mod product_cache;
pub mod product_source;
pub mod proxy;

// Re-export commonly used items
pub use checkpoint_store::{CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore};
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use fetch_error::FetchError;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use notifier::{DiscordWebhookNotifier, EmbedStyle, LogNotifier, ProductNotifier};
pub use parsing::{ParsingError, ParsingResult};
pub use product_cache::{CacheError, CacheRow, MemoryProductCache, ProductCache, SqliteProductCache};
pub use product_source::{Endpoint, ProductSource, SlamJamApi};
pub use proxy::{ProxyCredential, ProxyPool};
