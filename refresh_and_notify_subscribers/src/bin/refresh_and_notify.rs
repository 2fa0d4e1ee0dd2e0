use refresh_and_notify_subscribers::config::Settings;
use refresh_and_notify_subscribers::RefreshAndNotify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry = shared_kernel::tracing::config_telemetry("refresh_and_notify")?;
    start().await
}

async fn start() -> anyhow::Result<()> {
    let settings = Settings::parse()?;
    let period = settings.refresh.interval();
    let job = RefreshAndNotify::from_settings(settings)?;

    tracing::info!(interval_secs = period.as_secs(), "Starting refresh loop");
    job.run_every(period, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
