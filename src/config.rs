// Runtime configuration
//
// Read from the process environment (after `.env` has been loaded by main).

use std::path::PathBuf;

use crate::ai::claude_client::DEFAULT_MODEL;
use crate::ai::CredentialManager;

pub const DEFAULT_PORT: u16 = 8384;
pub const DEFAULT_DB_PATH: &str = "vibelist.db";
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 5;
const MAX_RESOLVE_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic key; its absence is a configuration error at generation time, not at startup
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    /// Enables the RapidAPI search resolver used for backfilling missing video ids
    pub rapid_api_key: Option<String>,
    pub db_path: PathBuf,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub resolve_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            anthropic_api_key: None,
            anthropic_model: DEFAULT_MODEL.to_string(),
            rapid_api_key: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
            static_dir: None,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }
}

impl Config {
    /// Build from the real environment, falling back to the keychain for the API key.
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());

        if config.anthropic_api_key.is_none() {
            match CredentialManager::retrieve_api_key() {
                Ok(key) => config.anthropic_api_key = key,
                Err(e) => tracing::debug!("keychain lookup failed: {}", e),
            }
        }

        config
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let port = match get("VIBELIST_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid VIBELIST_PORT '{}'", raw);
                defaults.port
            }),
            None => defaults.port,
        };

        let resolve_concurrency = get("VIBELIST_RESOLVE_CONCURRENCY")
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(defaults.resolve_concurrency)
            .clamp(1, MAX_RESOLVE_CONCURRENCY);

        Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            rapid_api_key: get("RAPID_API_KEY"),
            db_path: get("VIBELIST_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            port,
            static_dir: get("VIBELIST_STATIC_DIR").map(PathBuf::from),
            resolve_concurrency,
        }
    }
}
