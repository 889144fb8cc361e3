mod backend;
mod catalog;
mod config;
mod errors;
mod models;
mod regeneration;
mod routes;
mod state;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::{HttpBackend, SessionProvider, StaticSession, ThumbnailBackend};
use crate::catalog::{run_resume_sync, ResumeCache, ResumeSync};
use crate::config::Config;
use crate::regeneration::{RegenerationConfig, RegenerationTracker};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting thumbnail worker v{}", env!("CARGO_PKG_VERSION"));

    let backend: Arc<dyn ThumbnailBackend> = Arc::new(HttpBackend::new(&config.backend_url)?);
    info!("Backend client initialized ({})", config.backend_url);

    let sessions: Arc<dyn SessionProvider> =
        Arc::new(StaticSession::new(config.backend_access_token.clone()));
    if sessions.current_session().await.is_none() {
        warn!("BACKEND_ACCESS_TOKEN not set: thumbnail polling and resume sync will be skipped");
    }

    // One tracker for the whole process; the cache is its completion listener.
    let tracker = RegenerationTracker::new(
        backend.clone(),
        sessions.clone(),
        RegenerationConfig::default(),
    );
    let cache = Arc::new(ResumeCache::default());
    tracker.set_completion_listener(cache.clone());
    let retry_ticker = tracker.spawn_retry_ticker();

    let shutdown = CancellationToken::new();
    let sync = tokio::spawn(run_resume_sync(
        ResumeSync {
            backend,
            sessions,
            cache: cache.clone(),
            tracker: tracker.clone(),
        },
        config.resume_sync_interval,
        shutdown.clone(),
    ));

    let state = AppState {
        tracker: tracker.clone(),
        cache,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    tracker.shutdown();
    let (ticker_result, sync_result) = tokio::join!(retry_ticker, sync);
    if let Err(e) = ticker_result.and(sync_result) {
        warn!("Background task ended abnormally: {e}");
    }

    info!("Thumbnail worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
