//! One sweep over an explicit PID range
//!
//! Usage: `check_range <start> <end>` with numeric bounds, both inclusive.

use anyhow::{Context, Result, bail};
use slamjam_monitor::application::MonitorContext;
use tokio_util::sync::CancellationToken;

fn parse_bound(args: &[String], index: usize, name: &str) -> Result<u32> {
    let raw = args
        .get(index)
        .with_context(|| format!("usage: check_range <start> <end> (missing {name})"))?;
    raw.trim()
        .trim_start_matches(['J', 'j'])
        .parse()
        .with_context(|| format!("{name} must be a number, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let start = parse_bound(&args, 1, "start")?;
    let end = parse_bound(&args, 2, "end")?;
    if start > end {
        bail!("start ({start}) must not exceed end ({end})");
    }

    let config = slamjam_monitor::bootstrap().await?;
    let context = MonitorContext::from_config(config).await?;
    let cancel = CancellationToken::new();
    slamjam_monitor::cancel_on_ctrl_c(cancel.clone());

    let report = context.check_range(start, end, &cancel).await;

    println!(
        "Checked {} of {} ids in {:.1}s: {} new, {} cached, {} known, {} not found, {} failed",
        report.checked(),
        report.total,
        report.duration.as_secs_f64(),
        report.new_products,
        report.cached,
        report.known,
        report.not_found,
        report.failed
    );
    if report.cancelled {
        bail!("sweep cancelled after {} skipped ids", report.skipped);
    }
    Ok(())
}
