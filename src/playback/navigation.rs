// Playlist navigation state machine
//
// Owns the current track index and volume for one playlist. Navigation only
// ever lands on songs that have a video id; when no such target exists the
// call returns `None` and nothing changes. Playback is circular.

use crate::db::Song;

use super::storage::PlaybackStateStore;

/// Result of a successful navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub song: Song,
    pub index: usize,
}

impl Transition {
    /// Video id of the target song; always present for a committed transition.
    pub fn video_id(&self) -> &str {
        self.song.video_id.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

pub struct PlaylistNavigator {
    playlist_id: String,
    songs: Vec<Song>,
    current_index: usize,
    volume: u8,
    /// Elapsed seconds restored from storage, cleared on the first track change
    resume_elapsed: u64,
    /// Last elapsed time reported by the player, used for unload persistence
    last_elapsed: f64,
    store: PlaybackStateStore,
}

impl PlaylistNavigator {
    /// Restore state for `playlist_id`, clamping the saved index into range.
    pub fn new(playlist_id: impl Into<String>, songs: Vec<Song>, store: PlaybackStateStore) -> Self {
        let playlist_id = playlist_id.into();
        let saved = store.load(&playlist_id);
        let current_index = saved.track_index.min(songs.len().saturating_sub(1));

        if current_index != saved.track_index {
            tracing::debug!(
                "Clamped saved index {} to {} for playlist {} ({} songs)",
                saved.track_index,
                current_index,
                playlist_id,
                songs.len()
            );
        }

        Self {
            playlist_id,
            songs,
            current_index,
            volume: saved.volume,
            resume_elapsed: saved.elapsed_seconds,
            last_elapsed: saved.elapsed_seconds as f64,
            store,
        }
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.current_index)
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Offset to start the current song at; zero once the track has changed.
    pub fn resume_elapsed(&self) -> u64 {
        self.resume_elapsed
    }

    pub fn go_to_next(&mut self) -> Option<Transition> {
        self.step(Direction::Forward)
    }

    pub fn go_to_previous(&mut self) -> Option<Transition> {
        self.step(Direction::Backward)
    }

    pub fn go_to_index(&mut self, index: usize) -> Option<Transition> {
        if !self.songs.get(index)?.is_playable() {
            return None;
        }
        Some(self.commit(index))
    }

    /// In-memory only; persisted with the next `persist_elapsed`.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    /// Save `(index, seconds, volume)`; called on every player time tick.
    pub fn persist_elapsed(&mut self, seconds: f64) {
        self.last_elapsed = seconds;
        self.store
            .save(&self.playlist_id, self.current_index, seconds, self.volume);
    }

    /// Save `(index, last reported elapsed, volume)` without a new time reading.
    pub fn persist_current(&self) {
        self.store
            .save(&self.playlist_id, self.current_index, self.last_elapsed, self.volume);
    }

    /// Save on shutdown using the last elapsed time the player reported.
    pub fn persist_on_unload(&self) {
        self.persist_current();
    }

    // Walk away from the current index, skipping unplayable songs. A full lap
    // comes back to the current song, which re-targets it when it is playable.
    fn step(&mut self, direction: Direction) -> Option<Transition> {
        let len = self.songs.len();
        if len == 0 {
            return None;
        }

        let target = (1..=len)
            .map(|offset| match direction {
                Direction::Forward => (self.current_index + offset) % len,
                Direction::Backward => (self.current_index + len - offset % len) % len,
            })
            .find(|&index| self.songs[index].is_playable())?;

        Some(self.commit(target))
    }

    fn commit(&mut self, index: usize) -> Transition {
        self.current_index = index;
        self.resume_elapsed = 0;
        self.last_elapsed = 0.0;
        self.store.clear_elapsed(&self.playlist_id);

        Transition {
            song: self.songs[index].clone(),
            index,
        }
    }
}
