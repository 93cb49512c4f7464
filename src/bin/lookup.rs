//! Look up a single product
//!
//! Runs the new-product check for the PID, then fetches its current detail
//! data bypassing the cache.
//!
//! Usage: `lookup <pid>` where `<pid>` is `J001000` or a bare `1000`.

use anyhow::{Context, Result, bail};
use slamjam_monitor::application::MonitorContext;
use slamjam_monitor::domain::normalize_pid;
use slamjam_monitor::infrastructure::notifier::product_text;

#[tokio::main]
async fn main() -> Result<()> {
    let Some(input) = std::env::args().nth(1) else {
        bail!("usage: lookup <pid>");
    };
    let pid = normalize_pid(&input).with_context(|| format!("invalid pid '{input}'"))?;

    let config = slamjam_monitor::bootstrap().await?;
    let context = MonitorContext::from_config(config).await?;

    match context.lookup(&pid).await? {
        Some(product) => println!("{}", product_text(&product)),
        None => println!("Product {pid} not found"),
    }
    Ok(())
}
