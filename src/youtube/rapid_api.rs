// RapidAPI "youtube-v31" search resolver
//
// Used when RAPID_API_KEY is configured; tried before the scraper when
// backfilling songs that were saved without a video id.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{ResolveError, VideoResolver};

const RAPID_API_HOST: &str = "youtube-v31.p.rapidapi.com";
const RAPID_API_URL: &str = "https://youtube-v31.p.rapidapi.com/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<ItemId>,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

pub struct RapidApiResolver {
    client: Client,
    api_key: String,
}

impl RapidApiResolver {
    pub fn new(api_key: String) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_key })
    }

    pub async fn search(&self, query: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .client
            .get(RAPID_API_URL)
            .query(&[
                ("q", query),
                ("part", "snippet,id"),
                ("regionCode", "US"),
                ("maxResults", "1"),
            ])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", RAPID_API_HOST)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        Ok(first_video_id(body))
    }
}

fn first_video_id(body: SearchResponse) -> Option<String> {
    body.items
        .into_iter()
        .next()
        .and_then(|item| item.id)
        .and_then(|id| id.video_id)
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl VideoResolver for RapidApiResolver {
    async fn resolve(&self, query: &str) -> Option<String> {
        match self.search(query).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("RapidAPI search failed for {}: {}", query, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_video_id() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"items":[{"id":{"kind":"youtube#video","videoId":"abc123"}},{"id":{"videoId":"zzz"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_video_id(body).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_channel_result_has_no_video_id() {
        let body: SearchResponse =
            serde_json::from_str(r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC1"}}]}"#)
                .unwrap();
        assert_eq!(first_video_id(body), None);
    }

    #[test]
    fn test_empty_items() {
        let body: SearchResponse = serde_json::from_str(r#"{"kind":"x"}"#).unwrap();
        assert_eq!(first_video_id(body), None);
    }
}
