use anyhow::Context;

use fire_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fire_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    let app = fire_api::app::build_app(&config)
        .await
        .context("failed to build application")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
