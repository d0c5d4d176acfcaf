use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;
#[cfg(test)]
mod testing;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsgate_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > OPSGATE_CONFIG env > ~/.opsgate/opsgate.toml
    let config_path = std::env::var("OPSGATE_CONFIG").ok();
    let config = opsgate_core::config::OpsgateConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            opsgate_core::config::OpsgateConfig::default()
        });

    // The API key never comes from the config file: env only, fail fast.
    let api_key = std::env::var(opsgate_core::config::API_KEY_ENV).map_err(|_| {
        anyhow::anyhow!(
            "{} environment variable is not set",
            opsgate_core::config::API_KEY_ENV
        )
    })?;

    let model = Arc::new(opsgate_model::GeminiClient::new(
        api_key,
        Some(config.model.base_url.clone()),
        config.model.name.clone(),
    ));
    let runner = Arc::new(opsgate_exec::ShellRunner::default());

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    info!(model = %config.model.name, "Gemini client initialized");

    let state = Arc::new(app::AppState::new(config, model, runner));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Opsgate gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
