use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use capstone_api::app::{build_app, services::build_services};
use capstone_api::config::ServerConfig;

const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capstone_observability::init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");
    if !config.cookie_secure {
        tracing::warn!("COOKIE_SECURE=false; refresh cookie will be sent over plain HTTP");
    }

    let bind_addr = config.bind_addr;
    let services = Arc::new(build_services(config)?);

    let purger = services.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = purger.refresh_tokens.purge_expired(Utc::now());
            if purged > 0 {
                tracing::debug!(purged, "expired refresh credentials dropped");
            }
        }
    });

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
