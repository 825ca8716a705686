// Application commands shared by the HTTP routes

pub mod playlists;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::ai::{ClaudeClient, PlaylistGenerator};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::youtube::{ChainResolver, RapidApiResolver, VideoResolver, YouTubeScraper};

pub use playlists::{generate_playlist, load_playlist, GeneratePlaylistRequest};

/// Everything a command needs: storage, the generator and the video resolver.
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    /// `None` when no Anthropic key is configured
    pub generator: Option<Arc<dyn PlaylistGenerator>>,
    pub resolver: Arc<dyn VideoResolver>,
    pub resolve_concurrency: usize,
}

impl AppState {
    /// Wire real clients from configuration.
    pub fn from_config(config: &Config, db: Arc<Mutex<Database>>) -> AppResult<Self> {
        let generator = match &config.anthropic_api_key {
            Some(key) => {
                let client = ClaudeClient::new(key.clone(), config.anthropic_model.clone())
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                Some(Arc::new(client) as Arc<dyn PlaylistGenerator>)
            }
            None => {
                tracing::warn!("ANTHROPIC_API_KEY is not set; playlist generation will fail");
                None
            }
        };

        let mut resolvers: Vec<Arc<dyn VideoResolver>> = Vec::new();
        if let Some(key) = &config.rapid_api_key {
            let rapid = RapidApiResolver::new(key.clone())
                .map_err(|e| AppError::Internal(e.to_string()))?;
            resolvers.push(Arc::new(rapid));
        }
        let scraper = YouTubeScraper::new().map_err(|e| AppError::Internal(e.to_string()))?;
        resolvers.push(Arc::new(scraper));

        Ok(AppState {
            db,
            generator,
            resolver: Arc::new(ChainResolver::new(resolvers)),
            resolve_concurrency: config.resolve_concurrency,
        })
    }

    pub fn db(&self) -> AppResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to lock database: {}", e)))
    }
}
