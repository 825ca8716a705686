// Playlist commands: generation from a vibe description, and loading with
// video id backfill

use serde::Deserialize;
use std::time::Instant;

use super::AppState;
use crate::ai::sanitize_description;
use crate::db::{Playlist, Song};
use crate::error::{AppError, AppResult};
use crate::youtube::resolve_songs;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePlaylistRequest {
    #[serde(default)]
    pub description: Option<String>,
}

/// Generate, resolve and store a playlist for `description`.
pub async fn generate_playlist(state: &AppState, description: Option<&str>) -> AppResult<Playlist> {
    let started = Instant::now();

    let description = description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Description is required".to_string()))?;
    let preview: String = description.chars().take(50).collect();
    tracing::info!("Starting playlist generation for \"{}...\"", preview);

    let generator = state.generator.as_ref().ok_or_else(|| {
        AppError::Configuration("ANTHROPIC_API_KEY environment variable is not set".to_string())
    })?;

    let sanitized = sanitize_description(description);
    if sanitized.trim().is_empty() {
        return Err(AppError::InvalidInput("Description is required".to_string()));
    }

    let result = async {
        let generated = generator
            .generate(&sanitized)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        tracing::info!(
            "Generated playlist \"{}\" with {} songs",
            generated.title,
            generated.songs.len()
        );

        let songs: Vec<Song> = generated
            .songs
            .into_iter()
            .map(|s| Song::new(s.title, s.artist))
            .collect();
        let songs = resolve_songs(state.resolver.as_ref(), songs, state.resolve_concurrency).await;
        let unresolved = songs.iter().filter(|s| !s.is_playable()).count();
        if unresolved > 0 {
            tracing::warn!("{} song(s) have no video id", unresolved);
        }

        let db = state.db()?;
        let playlist = db.create_playlist(&generated.title, description, &songs, Some(sanitized.as_str()))?;
        Ok::<_, AppError>(playlist)
    }
    .await;

    let elapsed_ms = started.elapsed().as_millis();
    match &result {
        Ok(playlist) => tracing::info!(
            "Playlist generation completed in {}ms. Playlist ID: {}",
            elapsed_ms,
            playlist.id
        ),
        Err(e) => tracing::error!("Playlist generation failed after {}ms: {}", elapsed_ms, e),
    }
    result
}

/// Fetch a playlist, resolving ids for songs that are still missing one.
/// The record is rewritten only when at least one new id was found.
pub async fn load_playlist(state: &AppState, id: &str) -> AppResult<Playlist> {
    let mut playlist = state
        .db()?
        .get_playlist(id)?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    let missing = playlist.songs.iter().filter(|s| !s.is_playable()).count();
    if missing == 0 {
        return Ok(playlist);
    }

    tracing::debug!("Backfilling {} video id(s) for playlist {}", missing, id);
    let songs = std::mem::take(&mut playlist.songs);
    playlist.songs = resolve_songs(state.resolver.as_ref(), songs, state.resolve_concurrency).await;

    let still_missing = playlist.songs.iter().filter(|s| !s.is_playable()).count();
    if still_missing < missing {
        state.db()?.save_playlist(&playlist)?;
        tracing::info!(
            "Backfilled {} video id(s) for playlist {}",
            missing - still_missing,
            id
        );
    }

    Ok(playlist)
}
