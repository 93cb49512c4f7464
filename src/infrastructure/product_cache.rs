//! Product cache: one row per PID holding the last fetched record
//!
//! The `wishlist` flag records whether the stored record came from the
//! detail (Wishlist-GetProduct) endpoint. Payloads are stored as a
//! versioned JSON envelope so rows stay readable across releases.

#![allow(clippy::uninlined_format_args)]

use crate::domain::ProductRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Envelope version written by this build
pub const PAYLOAD_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("product {pid} is already cached")]
    Duplicate { pid: String },

    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("unsupported cache payload version {0}")]
    UnsupportedVersion(u32),

    #[error("cached row for {pid} was not found")]
    Missing { pid: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// One cached product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    pub pid: String,
    pub product: ProductRecord,
    /// Record came from the detail endpoint
    pub wishlist: bool,
}

/// Storage boundary of the product cache
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Row for `pid`; with `wishlist_only` a row without the detail flag counts as absent
    async fn select(&self, pid: &str, wishlist_only: bool) -> CacheResult<Option<CacheRow>>;

    /// Add a row; fails with [`CacheError::Duplicate`] when `pid` is already cached
    async fn insert(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()>;

    /// Overwrite record and flag of an existing row
    async fn update(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    product: &'a ProductRecord,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    product: ProductRecord,
}

pub fn encode_payload(product: &ProductRecord) -> CacheResult<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        version: PAYLOAD_VERSION,
        product,
    })?)
}

pub fn decode_payload(data: &str) -> CacheResult<ProductRecord> {
    let header: VersionHeader = serde_json::from_str(data)?;
    if header.version != PAYLOAD_VERSION {
        return Err(CacheError::UnsupportedVersion(header.version));
    }
    let envelope: Envelope = serde_json::from_str(data)?;
    Ok(envelope.product)
}

/// sqlite-backed cache over the `products` table
#[derive(Clone)]
pub struct SqliteProductCache {
    pool: Arc<SqlitePool>,
}

impl SqliteProductCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Number of cached rows
    pub async fn count(&self) -> CacheResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl ProductCache for SqliteProductCache {
    async fn select(&self, pid: &str, wishlist_only: bool) -> CacheResult<Option<CacheRow>> {
        let row = sqlx::query(
            r#"
            SELECT pid, data, wishlist FROM products
            WHERE pid = ? AND (wishlist = 1 OR ? = 0)
            "#,
        )
        .bind(pid)
        .bind(wishlist_only)
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: String = row.try_get("data")?;
        Ok(Some(CacheRow {
            pid: row.try_get("pid")?,
            product: decode_payload(&data)?,
            wishlist: row.try_get("wishlist")?,
        }))
    }

    async fn insert(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()> {
        let data = encode_payload(product)?;
        let result = sqlx::query("INSERT INTO products (pid, data, wishlist) VALUES (?, ?, ?)")
            .bind(pid)
            .bind(&data)
            .bind(wishlist)
            .execute(&*self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!("Cached {} (wishlist={})", pid, wishlist);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(CacheError::Duplicate {
                pid: pid.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()> {
        let data = encode_payload(product)?;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET data = ?, wishlist = ?, updated_at = CURRENT_TIMESTAMP
            WHERE pid = ?
            "#,
        )
        .bind(&data)
        .bind(wishlist)
        .bind(pid)
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CacheError::Missing {
                pid: pid.to_string(),
            });
        }
        debug!("Updated cached {} (wishlist={})", pid, wishlist);
        Ok(())
    }
}

/// In-process cache with the same semantics, for tests and dry runs
#[derive(Default)]
pub struct MemoryProductCache {
    rows: RwLock<HashMap<String, CacheRow>>,
}

impl MemoryProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ProductCache for MemoryProductCache {
    async fn select(&self, pid: &str, wishlist_only: bool) -> CacheResult<Option<CacheRow>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(pid)
            .filter(|row| row.wishlist || !wishlist_only)
            .cloned())
    }

    async fn insert(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(pid) {
            return Err(CacheError::Duplicate {
                pid: pid.to_string(),
            });
        }
        rows.insert(
            pid.to_string(),
            CacheRow {
                pid: pid.to_string(),
                product: product.clone(),
                wishlist,
            },
        );
        Ok(())
    }

    async fn update(&self, pid: &str, product: &ProductRecord, wishlist: bool) -> CacheResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(pid).ok_or_else(|| CacheError::Missing {
            pid: pid.to_string(),
        })?;
        row.product = product.clone();
        row.wishlist = wishlist;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::fixtures::{detail_record, quick_view_record};
    use crate::infrastructure::database_connection::DatabaseConnection;
    use chrono::NaiveDate;

    fn created() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    async fn sqlite_cache() -> SqliteProductCache {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        SqliteProductCache::new(db.pool().clone())
    }

    async fn caches() -> Vec<(&'static str, Box<dyn ProductCache>)> {
        vec![
            ("sqlite", Box::new(sqlite_cache().await)),
            ("memory", Box::new(MemoryProductCache::new())),
        ]
    }

    #[tokio::test]
    async fn unknown_pid_is_absent() {
        for (name, cache) in caches().await {
            assert!(cache.select("J000001", false).await.unwrap().is_none(), "{name}");
            assert!(cache.select("J000001", true).await.unwrap().is_none(), "{name}");
        }
    }

    #[tokio::test]
    async fn detail_row_is_visible_to_both_lookups() {
        for (name, cache) in caches().await {
            let record = detail_record("J001000", created());
            cache.insert("J001000", &record, true).await.unwrap();

            let wishlist = cache.select("J001000", true).await.unwrap().unwrap();
            assert_eq!(wishlist.product, record, "{name}");
            assert!(wishlist.wishlist, "{name}");

            let any = cache.select("J001000", false).await.unwrap().unwrap();
            assert_eq!(any.product, record, "{name}");
        }
    }

    #[tokio::test]
    async fn quick_view_row_is_hidden_from_wishlist_lookup() {
        for (name, cache) in caches().await {
            let record = quick_view_record("J001000", created());
            cache.insert("J001000", &record, false).await.unwrap();

            assert!(cache.select("J001000", true).await.unwrap().is_none(), "{name}");
            let row = cache.select("J001000", false).await.unwrap().unwrap();
            assert_eq!(row.product, record, "{name}");
            assert!(!row.wishlist, "{name}");
        }
    }

    #[tokio::test]
    async fn update_overwrites_record_and_flag() {
        for (name, cache) in caches().await {
            let quick = quick_view_record("J001000", created());
            let detail = detail_record("J001000", created());
            cache.insert("J001000", &quick, false).await.unwrap();

            cache.update("J001000", &detail, true).await.unwrap();

            let row = cache.select("J001000", true).await.unwrap().unwrap();
            assert_eq!(row.product, detail, "{name}");
            assert!(row.wishlist, "{name}");
        }
    }

    #[tokio::test]
    async fn second_insert_is_a_duplicate_and_keeps_the_first() {
        for (name, cache) in caches().await {
            let first = quick_view_record("J001000", created());
            let second = detail_record("J001000", created());
            cache.insert("J001000", &first, false).await.unwrap();

            let err = cache.insert("J001000", &second, true).await.unwrap_err();
            assert!(matches!(err, CacheError::Duplicate { .. }), "{name}");

            let row = cache.select("J001000", false).await.unwrap().unwrap();
            assert_eq!(row.product, first, "{name}");
        }
    }

    #[tokio::test]
    async fn update_of_missing_row_is_reported() {
        for (name, cache) in caches().await {
            let record = detail_record("J001000", created());
            let err = cache.update("J001000", &record, true).await.unwrap_err();
            assert!(matches!(err, CacheError::Missing { .. }), "{name}");
        }
    }

    #[test]
    fn payload_is_versioned() {
        let record = quick_view_record("J001000", created());
        let encoded = encode_payload(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["product"]["id"], "J001000");
        assert_eq!(decode_payload(&encoded).unwrap(), record);
    }

    #[test]
    fn unknown_payload_version_is_rejected() {
        let err = decode_payload(r#"{"version": 7, "product": {}}"#).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedVersion(7)));
    }

    #[tokio::test]
    async fn sqlite_counts_rows() {
        let cache = sqlite_cache().await;
        cache
            .insert("J001000", &quick_view_record("J001000", created()), false)
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);
    }
}
