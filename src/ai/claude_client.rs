// Claude API client for playlist generation
//
// Implements communication with Anthropic's Messages API for:
// - Plain chat completions
// - Vibe-to-playlist generation (title + 12 songs as JSON)

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::prompt::{build_user_prompt, PLAYLIST_SIZE};
use super::system_prompt::SYSTEM_PROMPT;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: u32 = 2048;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse playlist response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No JSON found in response")]
    NoJson,

    #[error("Model returned an empty playlist")]
    Empty,
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

/// Request to Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// A song as the model suggests it, before any video id lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSong {
    pub title: String,
    pub artist: String,
}

/// Playlist generation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlaylist {
    pub title: String,
    pub songs: Vec<SuggestedSong>,
}

/// Turns a sanitized vibe description into a titled song list.
#[async_trait]
pub trait PlaylistGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> Result<GeneratedPlaylist, GenerationError>;
}

pub struct ClaudeClient {
    api_key: String,
    model: String,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key and model
    pub fn new(api_key: String, model: String) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    /// Send a chat message and get a complete response
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<String, GenerationError> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages,
            system: system_prompt,
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Api { status, body });
        }

        let claude_response: ClaudeResponse = response.json().await?;
        if claude_response.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!("Claude response was truncated at max_tokens");
        }

        let text = claude_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }

    /// Parse the model's answer into a playlist, keeping at most `PLAYLIST_SIZE` songs.
    pub fn parse_playlist(response_text: &str) -> Result<GeneratedPlaylist, GenerationError> {
        let json_text = Self::extract_json(response_text).ok_or(GenerationError::NoJson)?;
        let mut playlist: GeneratedPlaylist = serde_json::from_str(json_text)?;

        playlist
            .songs
            .retain(|s| !s.title.trim().is_empty() && !s.artist.trim().is_empty());
        if playlist.songs.is_empty() {
            return Err(GenerationError::Empty);
        }
        if playlist.songs.len() != PLAYLIST_SIZE {
            tracing::warn!(
                "Model returned {} songs, expected {}",
                playlist.songs.len(),
                PLAYLIST_SIZE
            );
        }
        playlist.songs.truncate(PLAYLIST_SIZE);

        Ok(playlist)
    }

    /// Extract JSON from response text (handles markdown code blocks)
    fn extract_json(text: &str) -> Option<&str> {
        // Claude might wrap it in markdown code blocks
        if let Some(start) = text.find("```json") {
            let json_start = start + 7;
            if let Some(end) = text[json_start..].find("```") {
                return Some(text[json_start..json_start + end].trim());
            }
        }

        if let Some(start) = text.find("```\n") {
            let json_start = start + 4;
            if let Some(end) = text[json_start..].find("```") {
                return Some(text[json_start..json_start + end].trim());
            }
        }

        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(text[start..=end].trim()),
            _ => None,
        }
    }
}

#[async_trait]
impl PlaylistGenerator for ClaudeClient {
    async fn generate(&self, description: &str) -> Result<GeneratedPlaylist, GenerationError> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: build_user_prompt(description),
        }];

        let response_text = self.chat(messages, Some(SYSTEM_PROMPT.to_string())).await?;
        Self::parse_playlist(&response_text)
    }
}
