// Modules
pub mod ai;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod playback;
pub mod server;
pub mod youtube;

use std::sync::{Arc, Mutex};

use commands::AppState;
use config::Config;
use db::Database;
use error::{AppError, AppResult};

/// Open the database, start the HTTP server and serve until ctrl-c.
pub async fn run(config: Config) -> AppResult<()> {
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Internal(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let db = Database::new(&config.db_path)?;
    db.run_migrations()?;
    tracing::info!("Database ready at {}", config.db_path.display());

    let state = Arc::new(AppState::from_config(&config, Arc::new(Mutex::new(db)))?);
    let server = server::start_server(config.port, state, config.static_dir.clone())
        .await
        .map_err(AppError::Internal)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
    }
    server.shutdown();
    Ok(())
}
