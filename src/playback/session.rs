// Playlist playback session
//
// Binds a navigator to a player controller: restores the saved position,
// auto-advances on end, error or near-end, and persists the position on every
// time tick and on close.

use std::future::Future;
use tokio::sync::mpsc;

use crate::db::Playlist;

use super::navigation::{PlaylistNavigator, Transition};
use super::player::{ControllerEvent, PlayerController, PlayerSurface};
use super::state::PlayerState;
use super::storage::PlaybackStateStore;

pub struct PlaylistSession {
    navigator: PlaylistNavigator,
    player: PlayerController,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    /// Errors since the last successful play; bounds auto-advance when nothing can play
    consecutive_errors: usize,
    closed: bool,
}

impl PlaylistSession {
    pub fn new(
        playlist: &Playlist,
        store: PlaybackStateStore,
        player: PlayerController,
        events: mpsc::UnboundedReceiver<ControllerEvent>,
    ) -> Self {
        let navigator = PlaylistNavigator::new(playlist.id.clone(), playlist.songs.clone(), store);
        Self {
            navigator,
            player,
            events,
            consecutive_errors: 0,
            closed: false,
        }
    }

    pub fn navigator(&self) -> &PlaylistNavigator {
        &self.navigator
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    /// Mount the player on the restored track at the restored offset.
    pub async fn start(&mut self, surface: PlayerSurface) {
        let video_id = self
            .navigator
            .current_song()
            .filter(|s| s.is_playable())
            .and_then(|s| s.video_id.clone());

        tracing::info!(
            "Starting playlist {} at track {} ({}s)",
            self.navigator.playlist_id(),
            self.navigator.current_index(),
            self.navigator.resume_elapsed()
        );

        self.player
            .initialize(
                surface,
                video_id.as_deref(),
                self.navigator.resume_elapsed(),
                self.navigator.volume(),
            )
            .await;
    }

    pub async fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::StateChanged(PlayerState::Ended) => self.advance("ended").await,
            ControllerEvent::Error(code) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors > self.navigator.songs().len() {
                    tracing::warn!("Player error {} on every track, not advancing", code);
                    return;
                }
                tracing::warn!("Skipping track after player error {}", code);
                self.advance("error").await;
            }
            ControllerEvent::NearEnd => self.advance("near end").await,
            ControllerEvent::TimeUpdate(seconds) => self.navigator.persist_elapsed(seconds),
            ControllerEvent::StateChanged(PlayerState::Playing) => self.consecutive_errors = 0,
            ControllerEvent::Ready | ControllerEvent::StateChanged(_) => {}
        }
    }

    async fn advance(&mut self, reason: &str) {
        match self.navigator.go_to_next() {
            Some(transition) => {
                tracing::debug!("Auto-advancing ({})", reason);
                self.play_transition(transition).await;
            }
            None => tracing::debug!("Nothing playable to advance to"),
        }
    }

    async fn play_transition(&mut self, transition: Transition) {
        tracing::info!(
            "Now playing {} - {} [{}]",
            transition.song.title,
            transition.song.artist,
            transition.index
        );
        self.player.load_video(transition.video_id(), 0).await;
    }

    /// Jump to a track picked from the list. Unplayable picks are ignored.
    pub async fn select_track(&mut self, index: usize) -> bool {
        match self.navigator.go_to_index(index) {
            Some(transition) => {
                self.consecutive_errors = 0;
                self.play_transition(transition).await;
                true
            }
            None => false,
        }
    }

    pub async fn next(&mut self) -> bool {
        match self.navigator.go_to_next() {
            Some(transition) => {
                self.consecutive_errors = 0;
                self.play_transition(transition).await;
                true
            }
            None => false,
        }
    }

    pub async fn previous(&mut self) -> bool {
        match self.navigator.go_to_previous() {
            Some(transition) => {
                self.consecutive_errors = 0;
                self.play_transition(transition).await;
                true
            }
            None => false,
        }
    }

    pub fn toggle_play_pause(&self) {
        self.player.toggle_play_pause();
    }

    pub fn seek_to(&self, seconds: f64) {
        self.player.seek_to(seconds);
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.navigator.set_volume(volume);
        self.player.set_volume(volume);
        self.navigator.persist_current();
    }

    /// Handle controller events until `shutdown` completes or the player goes
    /// away, then close the session.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        self.close();
    }

    /// Persist the position and release the player. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.navigator.persist_on_unload();
        self.player.destroy();
    }
}

impl Drop for PlaylistSession {
    fn drop(&mut self) {
        self.close();
    }
}
