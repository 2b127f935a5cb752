use notes_service::config::NotesConfig;
use notes_service::services::metrics::init_metrics;
use notes_service::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NotesConfig::load()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        environment = ?config.environment,
        auth_mode = ?config.auth.effective_mode(),
        "Starting notes-service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
