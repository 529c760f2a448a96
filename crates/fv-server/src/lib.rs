//! fv-server: HTTP API server for attachment extraction and notifications.
//!
//! This crate ties the other fv-* crates into a running server:
//!
//! - Axum router with the Jellyfin-compatible attachment and notification
//!   endpoints, cache administration and OpenAPI docs
//! - [`AppContext`](context::AppContext) wiring config, catalogue, prober,
//!   cache and notifications together
//! - Graceful shutdown via signal handling or a [`CancellationToken`]

pub mod context;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod router;
pub mod routes;

use fv_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Serve the API until SIGINT, SIGTERM or `cancel` fires.
pub async fn start(config: Config, cancel: CancellationToken) -> fv_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let bind = (config.server.host.clone(), config.server.port);
    let ctx = AppContext::from_config(config)?;
    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&bind).await.map_err(|e| {
        fv_core::Error::Internal(format!("cannot listen on {}:{}: {e}", bind.0, bind.1))
    })?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("Interrupted"),
        _ = terminate => tracing::info!("Terminated"),
        _ = cancel.cancelled() => tracing::info!("Shutdown requested"),
    }
}
