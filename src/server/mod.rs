// HTTP server - Axum router for the playlist API and the optional web front-end

pub mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::commands::AppState;

/// Holds the running server's shutdown mechanism
pub struct RunningServer {
    pub shutdown_tx: oneshot::Sender<()>,
    pub addr: SocketAddr,
}

impl RunningServer {
    pub fn shutdown(self) {
        // The server task may already have exited
        let _ = self.shutdown_tx.send(());
    }
}

/// Full application router: API routes, CORS, request tracing and the static
/// front-end when `static_dir` exists.
pub fn build_router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    let api = routes::api_routes().with_state(state);

    let app = match static_dir.filter(|p| p.exists()) {
        Some(dir) => {
            tracing::info!("Serving front-end from {:?}", dir);
            let index = dir.join("index.html");
            api.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)))
        }
        None => {
            tracing::info!("No front-end directory, API-only mode");
            api
        }
    };

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Start the HTTP server on `port` (or a nearby free port).
/// Returns the running server handle (for shutdown) or an error.
pub async fn start_server(
    port: u16,
    state: Arc<AppState>,
    static_dir: Option<PathBuf>,
) -> Result<RunningServer, String> {
    let app = build_router(state, static_dir);

    let addr = try_bind(port).await?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    let actual_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local addr: {}", e))?;

    tracing::info!("Server listening on http://{}", actual_addr);

    tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Shutdown signal received, draining connections...");
            })
            .await;
        if let Err(e) = served {
            tracing::error!("Server error: {}", e);
        }
        tracing::info!("Server stopped");
    });

    Ok(RunningServer {
        shutdown_tx,
        addr: actual_addr,
    })
}

/// Try to bind to the given port, with fallback to nearby ports then OS-assigned.
/// Port 0 goes straight to an OS-assigned port.
async fn try_bind(preferred_port: u16) -> Result<SocketAddr, String> {
    if preferred_port != 0 {
        for offset in 0..=10u16 {
            let port = preferred_port.saturating_add(offset);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            if let Ok(listener) = tokio::net::TcpListener::bind(addr).await {
                drop(listener);
                if offset > 0 {
                    tracing::warn!("Port {} unavailable, using {}", preferred_port, port);
                }
                return Ok(addr);
            }
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], 0u16));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to any port: {}", e))?;
    let actual = listener.local_addr().map_err(|e| e.to_string())?;
    drop(listener);
    if preferred_port != 0 {
        tracing::warn!(
            "All preferred ports unavailable, OS assigned port {}",
            actual.port()
        );
    }
    Ok(actual)
}
