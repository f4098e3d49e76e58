use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

use signal_journal::{config::AppConfig, llm::OpenAiClient, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "proxy",
        api_key = %config.redacted_api_key(),
        base_url = %config.openai_base_url,
        extract_model = %config.extract_model,
        analyze_model = %config.analyze_model,
        "loaded proxy configuration"
    );

    let model = Arc::new(OpenAiClient::from_config(&config)?);
    let address = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config, model);
    let router = routes::create_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "proxy listening, endpoints under /api");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("proxy received shutdown signal");
            }
        })
        .await
        .context("proxy server failed")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
