//! End-to-end monitor flow over the public API
//!
//! A scripted storefront stands in for the network; the cache and checkpoint
//! live in an in-memory sqlite database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use slamjam_monitor::application::{Components, FixedClock, MonitorContext};
use slamjam_monitor::domain::{ProductRecord, ProductSummary, SizeAvailability, SizeStock};
use slamjam_monitor::infrastructure::{
    AppConfig, CheckpointStore, DatabaseConnection, Endpoint, FetchError, ProductCache,
    ProductNotifier, ProductSource, SqliteCheckpointStore, SqliteProductCache,
};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const TODAY: (i32, u32, u32) = (2024, 3, 10);

fn date(days_ago: i64) -> NaiveDate {
    let (y, m, d) = TODAY;
    NaiveDate::from_ymd_opt(y, m, d).unwrap() - chrono::Duration::days(days_ago)
}

fn summary(pid: &str, created: NaiveDate) -> ProductSummary {
    ProductSummary {
        id: pid.to_string(),
        name: format!("Product {pid}"),
        brand: "Stone Island".to_string(),
        created_date: created,
        price: Some("€ 250,00".to_string()),
        image_url: None,
    }
}

/// Storefront where odd numbers exist: J000001 is brand new, the rest are old
struct Storefront {
    requests: Mutex<Vec<(Endpoint, String)>>,
}

#[async_trait]
impl ProductSource for Storefront {
    async fn fetch(&self, endpoint: Endpoint, pid: &str) -> Result<ProductRecord, FetchError> {
        self.requests.lock().unwrap().push((endpoint, pid.to_string()));

        let number: u32 = pid.trim_start_matches('J').parse().unwrap_or(0);
        if number % 2 == 0 {
            return Err(FetchError::NotFound { status: 404 });
        }
        let created = if number == 1 { date(0) } else { date(30) };

        Ok(match endpoint {
            Endpoint::Detail => {
                let sizes: SizeAvailability = [(
                    "M",
                    SizeStock {
                        checkout_id: format!("{pid}-M"),
                        in_stock: true,
                    },
                )]
                .into_iter()
                .collect();
                ProductRecord::from_detail(summary(pid, created), sizes)
            }
            Endpoint::QuickView => ProductRecord::from_quick_view(summary(pid, created)),
        })
    }
}

#[derive(Default)]
struct Announcements(Mutex<Vec<String>>);

#[async_trait]
impl ProductNotifier for Announcements {
    async fn notify_new_product(&self, product: &ProductRecord) -> Result<()> {
        self.0.lock().unwrap().push(product.id().to_string());
        Ok(())
    }
}

struct Setup {
    context: MonitorContext,
    cache: Arc<SqliteProductCache>,
    checkpoints: Arc<SqliteCheckpointStore>,
    storefront: Arc<Storefront>,
    announcements: Arc<Announcements>,
}

async fn setup() -> Result<Setup> {
    let db = DatabaseConnection::in_memory().await?;
    db.migrate().await?;

    let mut config = AppConfig::default();
    config.monitor.start = 1;
    config.monitor.end = 6;
    config.monitor.max_concurrent = 3;
    config.monitor.retry_backoff_ms = 0;

    let cache = Arc::new(SqliteProductCache::new(db.pool().clone()));
    let checkpoints = Arc::new(SqliteCheckpointStore::new(db.pool().clone()));
    let storefront = Arc::new(Storefront {
        requests: Mutex::new(Vec::new()),
    });
    let announcements = Arc::new(Announcements::default());

    let context = MonitorContext::with_components(
        config,
        Components {
            cache: cache.clone(),
            checkpoints: checkpoints.clone(),
            source: storefront.clone(),
            notifier: announcements.clone(),
            clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())),
        },
    );

    Ok(Setup {
        context,
        cache,
        checkpoints,
        storefront,
        announcements,
    })
}

#[tokio::test]
async fn sweep_caches_found_products_and_announces_new_ones() -> Result<()> {
    let s = setup().await?;

    let report = s.context.check_range(1, 6, &CancellationToken::new()).await;

    assert_eq!(report.total, 6);
    assert_eq!(report.new_products, 1);
    assert_eq!(report.known, 2);
    assert_eq!(report.not_found, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(*s.announcements.0.lock().unwrap(), vec!["J000001"]);

    for pid in ["J000001", "J000003", "J000005"] {
        assert!(s.cache.select(pid, false).await?.is_some(), "{pid} cached");
    }
    assert!(s.cache.select("J000002", false).await?.is_none());
    assert_eq!(s.cache.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn second_sweep_is_served_from_cache() -> Result<()> {
    let s = setup().await?;
    let cancel = CancellationToken::new();

    s.context.check_range(1, 6, &cancel).await;
    let fetched = s.storefront.requests.lock().unwrap().len();
    let report = s.context.check_range(1, 6, &cancel).await;

    assert_eq!(report.cached, 3);
    assert_eq!(report.new_products, 0);
    // only the missing ids are asked for again
    assert_eq!(s.storefront.requests.lock().unwrap().len(), fetched + 3);
    assert_eq!(s.announcements.0.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn lookup_upgrades_cache_row_to_detail_data() -> Result<()> {
    let s = setup().await?;

    let product = s.context.lookup("J000003").await?.expect("product exists");

    assert!(product.sourced_from_detail_endpoint());
    assert_eq!(product.size_availability().map(|sizes| sizes.len()), Some(1));
    let row = s.cache.select("J000003", true).await?.expect("detail row");
    assert!(row.wishlist);
    assert_eq!(row.product, product);
    Ok(())
}

#[tokio::test]
async fn lookup_of_missing_product_is_none() -> Result<()> {
    let s = setup().await?;

    assert!(s.context.lookup("J000004").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn cancelled_scheduler_leaves_no_checkpoint() -> Result<()> {
    let s = setup().await?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    s.context.scheduler().run(cancel).await?;

    assert!(s.checkpoints.load().await?.is_none());
    assert!(s.storefront.requests.lock().unwrap().is_empty());
    Ok(())
}
