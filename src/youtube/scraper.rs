// YouTube search-page scraper
//
// Fetches the public results page and takes the first embedded "videoId".
// No API key needed, which makes it the default resolver at generation time.

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

use super::{ResolveError, VideoResolver};

const SEARCH_URL: &str = "https://www.youtube.com/results";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const VIDEO_ID_MARKER: &str = "\"videoId\":\"";

pub struct YouTubeScraper {
    client: Client,
    search_url: String,
}

impl YouTubeScraper {
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_search_url(SEARCH_URL)
    }

    /// Point the scraper at a different results endpoint (used by tests).
    pub fn with_search_url(search_url: &str) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.to_string(),
        })
    }

    pub async fn search(&self, query: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("search_query", query)])
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        Ok(extract_first_video_id(&html).map(str::to_string))
    }
}

#[async_trait]
impl VideoResolver for YouTubeScraper {
    async fn resolve(&self, query: &str) -> Option<String> {
        match self.search(query).await {
            Ok(Some(id)) => {
                tracing::debug!("Found video ID for \"{}\": {}", query, id);
                Some(id)
            }
            Ok(None) => {
                tracing::warn!("No video IDs found in search results for: {}", query);
                None
            }
            Err(e) => {
                tracing::warn!("Error searching YouTube for {}: {}", query, e);
                None
            }
        }
    }
}

/// First non-empty `"videoId":"..."` value in the page, i.e. the top result.
/// Empty values are skipped the way a `"videoId":"([^"]+)"` match would skip them.
pub fn extract_first_video_id(html: &str) -> Option<&str> {
    let mut rest = html;
    while let Some(pos) = rest.find(VIDEO_ID_MARKER) {
        let start = pos + VIDEO_ID_MARKER.len();
        let tail = &rest[start..];
        let end = tail.find('"')?;
        if end > 0 {
            return Some(&tail[..end]);
        }
        rest = &tail[end..];
    }
    None
}
