use model_relay::config::RelayConfig;
use model_relay::services::init_metrics;
use model_relay::startup::Application;
use service_core::observability::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = RelayConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "model-relay",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    init_metrics()?;

    let host = configuration.common.host.clone();
    let application = Application::build(configuration).await?;

    info!(
        "Starting model-relay on http://{}:{}",
        host,
        application.port()
    );
    application.run_until_stopped().await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
