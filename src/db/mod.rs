// Database layer - SQLite connection, migrations, queries

use rand::{thread_rng, Rng};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A song in a playlist. `video_id` stays empty when no playable video was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Song {
            title: title.into(),
            artist: artist.into(),
            video_id: None,
        }
    }

    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// True when the song can be handed to the player.
    pub fn is_playable(&self) -> bool {
        self.video_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Search query used to resolve the song's video id.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

/// Represents a generated playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: String,
    pub songs: Vec<Song>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Generate a document-store style playlist id (96 random bits, hex-encoded)
pub fn generate_playlist_id() -> String {
    let mut rng = thread_rng();
    (0..12).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Database { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Database { conn })
    }

    /// Run migrations to set up the database schema. Safe to re-run.
    pub fn run_migrations(&self) -> Result<()> {
        let migration_001 = include_str!("migrations/001_init.sql");
        self.conn.execute_batch(migration_001)?;
        Ok(())
    }

    // --- Settings operations ---

    /// Get a setting value by key. Returns None if the key doesn't exist.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?;
        Ok(value.flatten())
    }

    /// Set a setting value (upsert: insert or update if key exists).
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a setting by key.
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }

    // --- Playlist operations ---

    /// Insert a new playlist with a freshly generated id. Returns the stored record.
    pub fn create_playlist(
        &self,
        title: &str,
        description: &str,
        songs: &[Song],
        prompt: Option<&str>,
    ) -> Result<Playlist> {
        let playlist = Playlist {
            id: generate_playlist_id(),
            title: title.to_string(),
            description: description.to_string(),
            songs: songs.to_vec(),
            prompt: prompt.map(str::to_string),
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO playlists (id, title, description, prompt) VALUES (?, ?, ?, ?)",
            params![playlist.id, playlist.title, playlist.description, playlist.prompt],
        )?;
        Self::insert_songs(&tx, &playlist.id, &playlist.songs)?;
        tx.commit()?;

        Ok(playlist)
    }

    /// Get a single playlist by id, with its songs in order.
    pub fn get_playlist(&self, id: &str) -> Result<Option<Playlist>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, title, description, prompt FROM playlists WHERE id = ?",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, description, prompt)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT title, artist, video_id FROM playlist_songs
             WHERE playlist_id = ? ORDER BY position",
        )?;
        let songs = stmt
            .query_map([&id], |row| {
                Ok(Song {
                    title: row.get(0)?,
                    artist: row.get(1)?,
                    video_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<Song>>>()?;

        Ok(Some(Playlist {
            id,
            title,
            description,
            songs,
            prompt,
        }))
    }

    /// Overwrite a whole playlist record (used to backfill resolved video ids).
    pub fn save_playlist(&self, playlist: &Playlist) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE playlists SET title = ?, description = ?, prompt = ?, updated_at = datetime('now')
             WHERE id = ?",
            params![playlist.title, playlist.description, playlist.prompt, playlist.id],
        )?;
        if updated == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows);
        }
        tx.execute("DELETE FROM playlist_songs WHERE playlist_id = ?", [&playlist.id])?;
        Self::insert_songs(&tx, &playlist.id, &playlist.songs)?;
        tx.commit()
    }

    /// Count all stored playlists
    pub fn count_playlists(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM playlists", [], |row| row.get(0))
    }

    fn insert_songs(conn: &Connection, playlist_id: &str, songs: &[Song]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO playlist_songs (playlist_id, position, title, artist, video_id)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        for (position, song) in songs.iter().enumerate() {
            stmt.execute(params![
                playlist_id,
                position as i64,
                song.title,
                song.artist,
                song.video_id
            ])?;
        }
        Ok(())
    }
}
