//! Application builder and server loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use tandem_core::clock::SystemClock;
use tandem_core::config::AppConfig;
use tandem_core::error::{AppError, ErrorKind};
use tandem_database::StoreBackend;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the Tandem server until Ctrl+C or SIGTERM.
///
/// On shutdown every open feed is cancelled, in-flight requests get
/// `server.shutdown_grace_seconds` to finish, and the store pool is
/// closed last.
pub async fn run_server(config: AppConfig, stores: StoreBackend) -> Result<(), AppError> {
    info!("Starting Tandem server...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, stores.clone(), Arc::new(SystemClock));
    let realtime = state.realtime.clone();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e))?;
    info!("Tandem server listening on {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        realtime.shutdown();
        let _ = signalled_tx.send(());
    });
    let server = server.into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out");
            Ok(())
        }
    };

    stores.close().await;
    info!("Tandem server stopped");
    result.map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
