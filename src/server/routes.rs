// REST API routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::commands::{self, AppState, GeneratePlaylistRequest};
use crate::db::Playlist;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub name: String,
    pub version: String,
    pub playlist_count: i64,
}

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/generate-playlist", post(generate_playlist))
        .route("/api/playlists/{id}", get(get_playlist))
}

async fn get_health(State(state): State<Arc<AppState>>) -> AppResult<Json<HealthResponse>> {
    let playlist_count = state.db()?.count_playlists()?;
    Ok(Json(HealthResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        playlist_count,
    }))
}

async fn generate_playlist(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GeneratePlaylistRequest>, JsonRejection>,
) -> AppResult<Json<Playlist>> {
    // An unreadable body is treated the same as a missing description
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected generate request body: {}", rejection);
            return Err(AppError::InvalidInput("Description is required".to_string()));
        }
    };

    let playlist = commands::generate_playlist(&state, request.description.as_deref()).await?;
    Ok(Json(playlist))
}

async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Playlist>> {
    let playlist = commands::load_playlist(&state, &id).await?;
    Ok(Json(playlist))
}
