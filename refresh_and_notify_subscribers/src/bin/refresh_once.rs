use refresh_and_notify_subscribers::config::Settings;
use refresh_and_notify_subscribers::RefreshAndNotify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry = shared_kernel::tracing::config_telemetry("refresh_once")?;
    start().await
}

async fn start() -> anyhow::Result<()> {
    let job = RefreshAndNotify::from_settings(Settings::parse()?)?;
    let report = job.run_cycle().await;
    tracing::info!(
        delivered = report.delivered,
        failed = report.failed,
        unreachable = report.unreachable.len(),
        "Single refresh finished"
    );
    Ok(())
}
