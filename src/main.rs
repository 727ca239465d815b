use anyhow::Context;
use commentguard_core::{ErrorExt, ModerationConfig};
use graph_client::GraphApiClient;
use moderation_service::BackgroundService;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "commentguard=info,moderation_service=info,graph_client=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Commentguard - page comment moderator");

    let run_once = std::env::args().skip(1).any(|arg| arg == "--once");

    let config = ModerationConfig::load()
        .inspect_err(|e| {
            e.log_error();
        })
        .context("failed to load configuration")?;

    let client = Arc::new(
        GraphApiClient::from_moderation_config(&config)
            .context("failed to build Graph API client")?,
    );
    let service = BackgroundService::from_config(client.clone(), config);

    if run_once {
        let summary = service.run_once().await?;
        tracing::info!(
            "Cycle {} hid {} of {} comments",
            summary.cycle_id,
            summary.comments_hidden,
            summary.comments_evaluated
        );
    } else {
        service
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
                tracing::info!("Shutdown requested");
            })
            .await;
    }

    match client.export_metrics().await {
        Ok(metrics) => tracing::info!("API usage: {}", metrics),
        Err(e) => tracing::warn!("Could not export API metrics: {}", e),
    }

    Ok(())
}
