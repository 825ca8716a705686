// Video id resolution
//
// Best-effort lookup of a playable video id for a "{title} {artist}" query.
// Every resolver failure collapses to `None`; a song without an id is simply
// unplayable and navigation skips it.

pub mod rapid_api;
pub mod scraper;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;

use crate::db::Song;

pub use rapid_api::RapidApiResolver;
pub use scraper::YouTubeScraper;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// Best guess video id for the query, or `None`.
    async fn resolve(&self, query: &str) -> Option<String>;
}

/// Tries each resolver in order until one produces an id.
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn VideoResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Arc<dyn VideoResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl VideoResolver for ChainResolver {
    async fn resolve(&self, query: &str) -> Option<String> {
        for resolver in &self.resolvers {
            if let Some(id) = resolver.resolve(query).await {
                return Some(id);
            }
        }
        None
    }
}

/// Fill in missing video ids with at most `concurrency` lookups in flight.
/// Songs that already have an id are left untouched; output order matches input order.
pub async fn resolve_songs(
    resolver: &dyn VideoResolver,
    songs: Vec<Song>,
    concurrency: usize,
) -> Vec<Song> {
    stream::iter(songs)
        .map(|mut song| async move {
            if !song.is_playable() {
                song.video_id = resolver.resolve(&song.search_query()).await;
            }
            song
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
