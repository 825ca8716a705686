// AI module for Claude API integration and playlist generation
//
// This module provides:
// - Claude API client and the `PlaylistGenerator` seam
// - Description sanitisation and prompt construction
// - Secure credential storage via OS keychain
// - The curator system prompt

pub mod claude_client;
pub mod credentials;
pub mod prompt;
pub mod system_prompt;

// Re-export commonly used types
pub use claude_client::{ClaudeClient, GeneratedPlaylist, GenerationError, PlaylistGenerator, SuggestedSong};
pub use credentials::CredentialManager;
pub use prompt::{sanitize_description, PLAYLIST_SIZE};
pub use system_prompt::SYSTEM_PROMPT;
