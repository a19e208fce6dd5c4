use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wxtrack_core::WeatherProvider;
use wxtrack_db::DbClient;
use wxtrack_obs::LogFormat;
use wxtrack_provider::{OpenMeteoClient, OpenMeteoConfig, RetryConfig};
use wxtrack_refresh::Refresher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let cfg = wxtrack_config::AppConfig::load().context("failed to load configuration")?;

    // Observability
    wxtrack_obs::init_with("wxtrackd", LogFormat::parse(&cfg.log_format()));

    // Store
    let db = DbClient::new(&cfg.database_url())
        .await
        .context("failed to open database")?;

    // Provider client, shared by the refresh loop and the hourly resolver
    let provider: Arc<dyn WeatherProvider> = Arc::new(
        OpenMeteoClient::new(OpenMeteoConfig {
            base_url: cfg.provider_url(),
            request_timeout: cfg.request_timeout(),
            call_timeout: cfg.call_timeout(),
            cache_ttl: cfg.cache_ttl(),
            retry: RetryConfig::new(
                cfg.max_retries(),
                cfg.initial_backoff_ms(),
                cfg.max_backoff_ms(),
            ),
        })
        .context("failed to build provider client")?,
    );

    // Build app and state
    let (app, state) = wxtrack_server::build_app(db.clone(), Arc::clone(&provider))?;

    // Start the refresh loop in background
    let cancel = CancellationToken::new();
    let refresher = Arc::new(
        Refresher::new(Arc::new(db.clone()), provider)
            .with_interval(cfg.refresh_interval())
            .with_concurrency(cfg.refresh_concurrency()),
    );
    let refresh_task = refresher.spawn(cancel.clone());

    // Start HTTP server
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .with_context(|| format!("invalid HTTP bind address {}", cfg.http_bind()))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Mark ready just before serving
    wxtrack_server::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    wxtrack_server::set_ready(&state, false);
    cancel.cancel();
    if let Err(e) = refresh_task.await {
        tracing::error!(error = %e, "refresh task ended abnormally");
    }
    db.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
