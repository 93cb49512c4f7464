#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slamjam_monitor::run().await
}
