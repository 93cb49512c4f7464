//! Cache-first product lookup
//!
//! Reconciles the two endpoints into one cache row per PID: detail results
//! always win (insert or overwrite, flag set), quick-view results only
//! create rows that do not exist yet.

use crate::application::product_fetcher::ProductFetcher;
use crate::domain::ProductRecord;
use crate::infrastructure::product_cache::{CacheError, ProductCache};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub struct ProductService {
    cache: Arc<dyn ProductCache>,
    fetcher: Arc<ProductFetcher>,
}

impl ProductService {
    pub fn new(cache: Arc<dyn ProductCache>, fetcher: Arc<ProductFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn fetcher(&self) -> &ProductFetcher {
        &self.fetcher
    }

    /// Cached or freshly fetched record for `pid`.
    ///
    /// With `prefer_detail` only detail-sourced rows count as cache hits and
    /// fetches go to the detail endpoint. `Ok(None)` covers both a missing
    /// product and a fetch that ran out of attempts.
    pub async fn get_product(
        &self,
        pid: &str,
        prefer_detail: bool,
        use_cache: bool,
    ) -> Result<Option<ProductRecord>> {
        if use_cache {
            let cached = self
                .cache
                .select(pid, prefer_detail)
                .await
                .with_context(|| format!("Failed to read cache for {pid}"))?;
            if let Some(row) = cached {
                debug!("Cache hit for {} (wishlist={})", pid, row.wishlist);
                return Ok(Some(row.product));
            }
        }

        let Some(record) = self.fetcher.alternate_fetch(pid, prefer_detail).await.into_record() else {
            return Ok(None);
        };

        if record.sourced_from_detail_endpoint() {
            self.store_detail(pid, &record).await?;
        } else {
            self.store_quick_view(pid, &record).await?;
        }

        Ok(Some(record))
    }

    async fn store_detail(&self, pid: &str, record: &ProductRecord) -> Result<()> {
        let existing = self
            .cache
            .select(pid, false)
            .await
            .with_context(|| format!("Failed to read cache for {pid}"))?;

        let result = if existing.is_some() {
            self.cache.update(pid, record, true).await
        } else {
            match self.cache.insert(pid, record, true).await {
                // another check cached the pid in the meantime
                Err(CacheError::Duplicate { .. }) => self.cache.update(pid, record, true).await,
                other => other,
            }
        };

        result.with_context(|| format!("Failed to cache detail record for {pid}"))
    }

    async fn store_quick_view(&self, pid: &str, record: &ProductRecord) -> Result<()> {
        match self.cache.insert(pid, record, false).await {
            Ok(()) => Ok(()),
            Err(CacheError::Duplicate { .. }) => {
                debug!("{} already cached, keeping existing row", pid);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to cache quick view record for {pid}")),
        }
    }
}
