//! On-demand single product lookup

use crate::application::product_service::ProductService;
use crate::application::range_monitor::{CheckOutcome, RangeMonitor};
use crate::domain::ProductRecord;
use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Announce `pid` if it is new, then return its current detail data.
///
/// The detail fetch bypasses the cache. `Ok(None)` means the product was
/// not found or did not answer within the attempt budget.
pub async fn lookup_product(
    monitor: &RangeMonitor,
    products: &ProductService,
    pid: &str,
) -> Result<Option<ProductRecord>> {
    let gate = Semaphore::new(1);
    match monitor.check_id(pid, &gate).await {
        Ok(CheckOutcome::NewProduct) => debug!("{} announced as new", pid),
        Ok(outcome) => debug!("{} check: {:?}", pid, outcome),
        Err(e) => warn!("⚠️ New-product check failed for {}: {:#}", pid, e),
    }

    products.get_product(pid, true, false).await
}
