// Embedded player controller
//
// Owns exactly one external player instance for its lifetime. Host events are
// funnelled through a single pump task, so state handling never runs
// concurrently with itself. While playing, a polling task reports elapsed
// time and fires a one-shot near-end signal per loaded video.
//
// Every command sent to the external player is best-effort: rejections
// (autoplay policy, player gone) are logged at debug and dropped.

use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::ready::ApiReadiness;
use super::state::{PlayerState, StateEffect};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("command rejected by player: {0}")]
    Rejected(String),

    #[error("failed to construct player: {0}")]
    Construction(String),
}

/// Error code reported when the player could not be constructed at all.
pub const CONSTRUCTION_FAILED: i32 = -1;

/// UI element the player is mounted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSurface(pub String);

/// Construction options for the external player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub video_id: String,
    pub start_seconds: u64,
    pub autoplay: bool,
    pub controls: bool,
    pub keyboard: bool,
    pub fullscreen: bool,
    pub annotations: bool,
    pub modest_branding: bool,
    pub plays_inline: bool,
    pub related_videos: bool,
    pub muted: bool,
}

impl PlayerConfig {
    pub fn new(video_id: impl Into<String>, start_seconds: u64) -> Self {
        PlayerConfig {
            video_id: video_id.into(),
            start_seconds,
            autoplay: true,
            controls: true,
            keyboard: true,
            fullscreen: true,
            annotations: false,
            modest_branding: true,
            plays_inline: true,
            related_videos: false,
            muted: false,
        }
    }

    /// Embed parameters in the iframe API's `playerVars` shape.
    pub fn player_vars(&self) -> serde_json::Value {
        let flag = |b: bool| u8::from(b);
        let annotations = if self.annotations { 1 } else { 3 };
        json!({
            "autoplay": flag(self.autoplay),
            "controls": flag(self.controls),
            "disablekb": flag(!self.keyboard),
            "enablejsapi": 1,
            "fs": flag(self.fullscreen),
            "iv_load_policy": annotations,
            "modestbranding": flag(self.modest_branding),
            "playsinline": flag(self.plays_inline),
            "rel": flag(self.related_videos),
            "start": self.start_seconds,
            "mute": flag(self.muted),
        })
    }
}

/// Raw events raised by the external player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Ready,
    StateChange(i32),
    Error(i32),
}

/// Events the controller reports to its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    Ready,
    StateChanged(PlayerState),
    Error(i32),
    TimeUpdate(f64),
    NearEnd,
}

/// A constructed external player instance.
pub trait PlayerBackend: Send + Sync {
    fn play_video(&self) -> Result<(), PlayerError>;
    fn pause_video(&self) -> Result<(), PlayerError>;
    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError>;
    fn load_video_by_id(&self, video_id: &str, start_seconds: u64) -> Result<(), PlayerError>;
    fn set_volume(&self, volume: u8) -> Result<(), PlayerError>;
    /// Elapsed seconds, or `None` while the player cannot tell yet
    fn current_time(&self) -> Option<f64>;
    /// Total seconds, or `None` until metadata is loaded
    fn duration(&self) -> Option<f64>;
    fn destroy(&self);
}

/// The embeddable player API.
pub trait PlayerHost: Send + Sync {
    /// Start loading the player API. The host resolves the shared
    /// `ApiReadiness` once the API announces itself.
    fn load_api(&self);

    fn create_player(
        &self,
        surface: &PlayerSurface,
        config: &PlayerConfig,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Result<Arc<dyn PlayerBackend>, PlayerError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerTiming {
    /// Delay between entering Playing and arming the poll interval
    pub poll_delay: Duration,
    pub poll_interval: Duration,
    /// Second play attempt after Ready
    pub ready_retry: Duration,
    /// Play nudge after a video is cued
    pub cued_nudge: Duration,
    /// Play attempt after a programmatic load
    pub load_retry: Duration,
    /// Remaining seconds at which the near-end signal fires
    pub near_end_threshold: f64,
}

impl Default for PlayerTiming {
    fn default() -> Self {
        PlayerTiming {
            poll_delay: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1000),
            ready_retry: Duration::from_millis(500),
            cued_nudge: Duration::from_millis(100),
            load_retry: Duration::from_millis(1000),
            near_end_threshold: 10.0,
        }
    }
}

#[derive(Default)]
struct Tasks {
    pump: Option<JoinHandle<()>>,
    polling: Option<JoinHandle<()>>,
    delayed: Vec<JoinHandle<()>>,
}

impl Tasks {
    fn abort_all(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(polling) = self.polling.take() {
            polling.abort();
        }
        for task in self.delayed.drain(..) {
            task.abort();
        }
    }
}

struct Shared {
    backend: Mutex<Option<Arc<dyn PlayerBackend>>>,
    state: Mutex<PlayerState>,
    tasks: Mutex<Tasks>,
    ready: AtomicBool,
    playing: AtomicBool,
    near_end_fired: AtomicBool,
    volume: AtomicU8,
    // f64 seconds stored as bits
    current_time: AtomicU64,
    duration: AtomicU64,
    events: mpsc::UnboundedSender<ControllerEvent>,
    timing: PlayerTiming,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn swallow(command: &str, result: Result<(), PlayerError>) {
    if let Err(e) = result {
        tracing::debug!("Player {} failed: {}", command, e);
    }
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

impl Shared {
    fn backend(&self) -> Option<Arc<dyn PlayerBackend>> {
        lock(&self.backend).clone()
    }

    fn emit(&self, event: ControllerEvent) {
        // Nobody listening is fine; the owner may already be gone
        let _ = self.events.send(event);
    }

    fn handle_player_event(self: &Arc<Self>, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => self.on_ready(),
            PlayerEvent::StateChange(code) => {
                let state = PlayerState::from_code(code).unwrap_or_else(|| {
                    tracing::debug!("Unknown player state code {}", code);
                    PlayerState::Unstarted
                });
                self.on_state_change(state);
            }
            PlayerEvent::Error(code) => {
                tracing::warn!("Player error {}", code);
                self.emit(ControllerEvent::Error(code));
            }
        }
    }

    fn on_ready(self: &Arc<Self>) {
        self.ready.store(true, Ordering::SeqCst);

        if let Some(backend) = self.backend() {
            swallow("set_volume", backend.set_volume(self.volume.load(Ordering::SeqCst)));
            if let Some(duration) = backend.duration() {
                self.duration.store(duration.to_bits(), Ordering::SeqCst);
            }
            swallow("play", backend.play_video());
        }
        // Autoplay may be blocked on the first attempt
        self.schedule_play(self.timing.ready_retry);

        self.emit(ControllerEvent::Ready);
    }

    fn on_state_change(self: &Arc<Self>, state: PlayerState) {
        tracing::debug!("Player state {:?} ({})", state, state.code());
        *lock(&self.state) = state;

        match state.on_enter() {
            StateEffect::StartPolling => {
                self.playing.store(true, Ordering::SeqCst);
                self.start_polling();
            }
            StateEffect::StopPolling => {
                self.playing.store(false, Ordering::SeqCst);
                self.stop_polling();
            }
            StateEffect::NudgePlay => self.schedule_play(self.timing.cued_nudge),
            StateEffect::Nothing => {}
        }

        self.emit(ControllerEvent::StateChanged(state));
    }

    fn start_polling(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(shared.timing.poll_delay).await;

            let period = shared.timing.poll_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.poll_tick();
            }
        });

        if let Some(previous) = lock(&self.tasks).polling.replace(task) {
            previous.abort();
        }
    }

    fn stop_polling(&self) {
        if let Some(polling) = lock(&self.tasks).polling.take() {
            polling.abort();
        }
    }

    fn poll_tick(&self) {
        let Some(backend) = self.backend() else {
            return;
        };
        let (Some(current), Some(duration)) = (backend.current_time(), backend.duration()) else {
            return;
        };
        if current < 0.0 || duration <= 0.0 {
            return;
        }

        self.current_time.store(current.to_bits(), Ordering::SeqCst);
        self.duration.store(duration.to_bits(), Ordering::SeqCst);
        self.emit(ControllerEvent::TimeUpdate(current));

        let remaining = duration - current;
        if remaining <= self.timing.near_end_threshold
            && !self.near_end_fired.swap(true, Ordering::SeqCst)
        {
            self.emit(ControllerEvent::NearEnd);
        }

        tracing::debug!(
            "Playing: {} / {} ({}%)",
            format_time(current),
            format_time(duration),
            (current / duration * 100.0).round()
        );
    }

    /// Fire-and-forget play command. Cancelled by teardown; a user pause in
    /// the meantime can still be overridden.
    fn schedule_play(&self, delay: Duration) {
        let backend = self.backend();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(backend) = backend {
                swallow("play", backend.play_video());
            }
        });

        let mut tasks = lock(&self.tasks);
        tasks.delayed.retain(|t| !t.is_finished());
        tasks.delayed.push(task);
    }

    fn teardown(&self) {
        lock(&self.tasks).abort_all();
        self.playing.store(false, Ordering::SeqCst);
        if let Some(backend) = lock(&self.backend).take() {
            backend.destroy();
        }
    }
}

struct PendingInit {
    surface: PlayerSurface,
}

pub struct PlayerController {
    shared: Arc<Shared>,
    host: Arc<dyn PlayerHost>,
    readiness: Arc<ApiReadiness>,
    pending: Option<PendingInit>,
}

impl PlayerController {
    pub fn new(
        host: Arc<dyn PlayerHost>,
        readiness: Arc<ApiReadiness>,
        timing: PlayerTiming,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            backend: Mutex::new(None),
            state: Mutex::new(PlayerState::Unstarted),
            tasks: Mutex::new(Tasks::default()),
            ready: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            near_end_fired: AtomicBool::new(false),
            volume: AtomicU8::new(100),
            current_time: AtomicU64::new(0f64.to_bits()),
            duration: AtomicU64::new(0f64.to_bits()),
            events,
            timing,
        });

        let controller = Self {
            shared,
            host,
            readiness,
            pending: None,
        };
        (controller, rx)
    }

    /// Construct the player once the API is loaded. Without a video id the
    /// construction is parked until `load_video` supplies one.
    pub async fn initialize(
        &mut self,
        surface: PlayerSurface,
        video_id: Option<&str>,
        start_seconds: u64,
        volume: u8,
    ) {
        if self.has_player() {
            tracing::debug!("Player already initialized");
            return;
        }
        self.shared.volume.store(volume.min(100), Ordering::SeqCst);

        match video_id.filter(|id| !id.is_empty()) {
            Some(video_id) => {
                let config = PlayerConfig::new(video_id, start_seconds);
                self.construct(surface, &config).await;
            }
            None => {
                tracing::debug!("No video id yet, deferring player construction");
                self.pending = Some(PendingInit { surface });
            }
        }
    }

    // A failed construction keeps the surface parked so the next `load_video`
    // retries, and reports an error so the owner can move on.
    async fn construct(&mut self, surface: PlayerSurface, config: &PlayerConfig) {
        let host = Arc::clone(&self.host);
        self.readiness.wait(|| host.load_api()).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        match self.host.create_player(&surface, config, tx) {
            Ok(backend) => {
                *lock(&self.shared.backend) = Some(backend);
                self.shared.near_end_fired.store(false, Ordering::SeqCst);

                let shared = Arc::clone(&self.shared);
                let pump = tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        shared.handle_player_event(event);
                    }
                });
                if let Some(old) = lock(&self.shared.tasks).pump.replace(pump) {
                    old.abort();
                }
                tracing::info!("Player created for video {}", config.video_id);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.pending = Some(PendingInit { surface });
                self.shared.emit(ControllerEvent::Error(CONSTRUCTION_FAILED));
            }
        }
    }

    /// Switch the existing player to another video, resetting the near-end latch.
    pub async fn load_video(&mut self, video_id: &str, start_seconds: u64) {
        if !self.has_player() {
            if let Some(pending) = self.pending.take() {
                let config = PlayerConfig::new(video_id, start_seconds);
                self.construct(pending.surface, &config).await;
            }
            return;
        }

        self.shared.near_end_fired.store(false, Ordering::SeqCst);
        self.shared
            .current_time
            .store((start_seconds as f64).to_bits(), Ordering::SeqCst);
        if let Some(backend) = self.shared.backend() {
            swallow("load", backend.load_video_by_id(video_id, start_seconds));
        }
        // Programmatic loads do not always autoplay
        self.shared.schedule_play(self.shared.timing.load_retry);
    }

    pub fn play(&self) {
        if let Some(backend) = self.shared.backend() {
            swallow("play", backend.play_video());
        }
    }

    pub fn pause(&self) {
        if let Some(backend) = self.shared.backend() {
            swallow("pause", backend.pause_video());
        }
    }

    pub fn toggle_play_pause(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek_to(&self, seconds: f64) {
        if let Some(backend) = self.shared.backend() {
            swallow("seek", backend.seek_to(seconds.max(0.0), true));
        }
    }

    pub fn set_volume(&self, volume: u8) {
        let volume = volume.min(100);
        self.shared.volume.store(volume, Ordering::SeqCst);
        if let Some(backend) = self.shared.backend() {
            swallow("set_volume", backend.set_volume(volume));
        }
    }

    pub fn has_player(&self) -> bool {
        lock(&self.shared.backend).is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PlayerState {
        *lock(&self.shared.state)
    }

    /// Elapsed seconds from the last poll tick
    pub fn current_time(&self) -> f64 {
        f64::from_bits(self.shared.current_time.load(Ordering::SeqCst))
    }

    pub fn duration(&self) -> f64 {
        f64::from_bits(self.shared.duration.load(Ordering::SeqCst))
    }

    /// Stop polling, cancel pending commands and release the player. Idempotent.
    pub fn destroy(&mut self) {
        self.pending = None;
        self.shared.teardown();
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Command {
        Play,
        Pause,
        Seek(f64),
        Load(String, u64),
        Volume(u8),
        Destroy,
    }

    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub commands: Mutex<Vec<Command>>,
        pub current_time: Mutex<Option<f64>>,
        pub duration: Mutex<Option<f64>>,
        pub reject: AtomicBool,
    }

    impl FakeBackend {
        pub(crate) fn commands(&self) -> Vec<Command> {
            lock(&self.commands).clone()
        }

        pub(crate) fn set_position(&self, current: f64, duration: f64) {
            *lock(&self.current_time) = Some(current);
            *lock(&self.duration) = Some(duration);
        }

        fn record(&self, command: Command) -> Result<(), PlayerError> {
            lock(&self.commands).push(command);
            if self.reject.load(Ordering::SeqCst) {
                Err(PlayerError::Rejected("autoplay blocked".into()))
            } else {
                Ok(())
            }
        }
    }

    impl PlayerBackend for FakeBackend {
        fn play_video(&self) -> Result<(), PlayerError> {
            self.record(Command::Play)
        }
        fn pause_video(&self) -> Result<(), PlayerError> {
            self.record(Command::Pause)
        }
        fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) -> Result<(), PlayerError> {
            self.record(Command::Seek(seconds))
        }
        fn load_video_by_id(&self, video_id: &str, start_seconds: u64) -> Result<(), PlayerError> {
            self.record(Command::Load(video_id.to_string(), start_seconds))
        }
        fn set_volume(&self, volume: u8) -> Result<(), PlayerError> {
            self.record(Command::Volume(volume))
        }
        fn current_time(&self) -> Option<f64> {
            *lock(&self.current_time)
        }
        fn duration(&self) -> Option<f64> {
            *lock(&self.duration)
        }
        fn destroy(&self) {
            lock(&self.commands).push(Command::Destroy);
        }
    }

    /// Host that becomes ready as soon as its API is requested.
    pub(crate) struct FakeHost {
        pub readiness: Arc<ApiReadiness>,
        pub backend: Arc<FakeBackend>,
        pub configs: Mutex<Vec<PlayerConfig>>,
        pub api_loads: Mutex<usize>,
        pub events: Mutex<Option<mpsc::UnboundedSender<PlayerEvent>>>,
        pub fail_construction: AtomicBool,
    }

    impl FakeHost {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(FakeHost {
                readiness: Arc::new(ApiReadiness::new()),
                backend: Arc::new(FakeBackend::default()),
                configs: Mutex::new(Vec::new()),
                api_loads: Mutex::new(0),
                events: Mutex::new(None),
                fail_construction: AtomicBool::new(false),
            })
        }

        /// Raise an event as the external player would.
        pub(crate) fn send(&self, event: PlayerEvent) {
            if let Some(tx) = lock(&self.events).as_ref() {
                tx.send(event).expect("pump alive");
            }
        }

        pub(crate) fn controller(
            self: &Arc<Self>,
        ) -> (PlayerController, mpsc::UnboundedReceiver<ControllerEvent>) {
            PlayerController::new(self.clone(), self.readiness.clone(), PlayerTiming::default())
        }
    }

    impl PlayerHost for FakeHost {
        fn load_api(&self) {
            *lock(&self.api_loads) += 1;
            self.readiness.resolve();
        }

        fn create_player(
            &self,
            _surface: &PlayerSurface,
            config: &PlayerConfig,
            events: mpsc::UnboundedSender<PlayerEvent>,
        ) -> Result<Arc<dyn PlayerBackend>, PlayerError> {
            if self.fail_construction.load(Ordering::SeqCst) {
                return Err(PlayerError::Construction("surface missing".into()));
            }
            lock(&self.configs).push(config.clone());
            *lock(&self.events) = Some(events);
            let backend: Arc<dyn PlayerBackend> = self.backend.clone();
            Ok(backend)
        }
    }

    /// Drain everything the controller has emitted so far.
    pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Vec<ControllerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    pub(crate) async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn surface() -> PlayerSurface {
        PlayerSurface("player".to_string())
    }

    fn count(events: &[ControllerEvent], wanted: ControllerEvent) -> usize {
        events.iter().filter(|e| **e == wanted).count()
    }

    #[test]
    fn test_player_vars() {
        let vars = PlayerConfig::new("abc", 42).player_vars();
        assert_eq!(vars["autoplay"], 1);
        assert_eq!(vars["rel"], 0);
        assert_eq!(vars["start"], 42);
        assert_eq!(vars["iv_load_policy"], 3);
        assert_eq!(vars["mute"], 0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(61.9), "1:01");
        assert_eq!(format_time(600.0), "10:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_constructs_one_player() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();

        player.initialize(surface(), Some("v1"), 30, 70).await;
        player.initialize(surface(), Some("v2"), 0, 70).await;

        let configs = lock(&host.configs).clone();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].video_id, "v1");
        assert_eq!(configs[0].start_seconds, 30);
        assert!(configs[0].autoplay);
        assert!(!configs[0].related_videos);
        assert_eq!(*lock(&host.api_loads), 1);
        assert!(player.has_player());
    }

    #[tokio::test(start_paused = true)]
    async fn test_construction_deferred_until_video_id() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();

        player.initialize(surface(), None, 12, 50).await;
        assert!(!player.has_player());
        assert!(lock(&host.configs).is_empty());

        player.load_video("late", 0).await;
        assert!(player.has_player());
        assert_eq!(lock(&host.configs)[0].video_id, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_before_construction_are_no_ops() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();
        player.play();
        player.pause();
        player.toggle_play_pause();
        player.seek_to(10.0);
        player.set_volume(20);
        player.load_video("nowhere", 0).await;

        assert!(!player.has_player());
        assert!(host.backend.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_applies_volume_and_retries_play() {
        let host = FakeHost::new();
        host.backend.set_position(0.0, 200.0);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 65).await;

        host.send(PlayerEvent::Ready);
        settle(10).await;
        assert!(player.is_ready());
        assert_eq!(player.duration(), 200.0);
        assert_eq!(
            host.backend.commands(),
            vec![Command::Volume(65), Command::Play]
        );
        assert_eq!(drain(&mut rx), vec![ControllerEvent::Ready]);

        settle(500).await;
        assert_eq!(
            host.backend.commands(),
            vec![Command::Volume(65), Command::Play, Command::Play]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_commands_are_swallowed() {
        let host = FakeHost::new();
        host.backend.reject.store(true, Ordering::SeqCst);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::Ready);
        settle(600).await;
        player.play();
        player.seek_to(5.0);

        assert_eq!(drain(&mut rx), vec![ControllerEvent::Ready]);
        assert!(host.backend.commands().contains(&Command::Seek(5.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playing_starts_time_tracking() {
        let host = FakeHost::new();
        host.backend.set_position(42.0, 180.0);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(10).await;
        assert!(player.is_playing());
        assert_eq!(player.state(), PlayerState::Playing);
        assert_eq!(
            drain(&mut rx),
            vec![ControllerEvent::StateChanged(PlayerState::Playing)]
        );

        // Nothing before the first interval has elapsed
        settle(1000).await;
        assert!(drain(&mut rx).is_empty());

        settle(300).await;
        assert_eq!(drain(&mut rx), vec![ControllerEvent::TimeUpdate(42.0)]);
        assert_eq!(player.current_time(), 42.0);

        settle(1000).await;
        assert_eq!(drain(&mut rx), vec![ControllerEvent::TimeUpdate(42.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skipped_until_times_known() {
        let host = FakeHost::new();
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(3300).await;
        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, ControllerEvent::TimeUpdate(_))));

        *lock(&host.backend.current_time) = Some(3.0);
        *lock(&host.backend.duration) = Some(0.0);
        settle(1000).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_end_stop_tracking() {
        let host = FakeHost::new();
        host.backend.set_position(10.0, 100.0);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(1300).await;
        host.send(PlayerEvent::StateChange(2));
        settle(10).await;
        assert!(!player.is_playing());
        drain(&mut rx);

        settle(5000).await;
        assert!(drain(&mut rx).is_empty());

        host.send(PlayerEvent::StateChange(0));
        settle(10).await;
        assert_eq!(
            drain(&mut rx),
            vec![ControllerEvent::StateChanged(PlayerState::Ended)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_near_end_fires_once_per_video() {
        let host = FakeHost::new();
        host.backend.set_position(85.0, 100.0);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(1300).await;
        assert_eq!(count(&drain(&mut rx), ControllerEvent::NearEnd), 0);

        host.backend.set_position(91.0, 100.0);
        settle(3000).await;
        let events = drain(&mut rx);
        assert_eq!(count(&events, ControllerEvent::NearEnd), 1);
        assert_eq!(count(&events, ControllerEvent::TimeUpdate(91.0)), 3);

        // Reloading (even the same video) re-arms the latch
        player.load_video("v1", 0).await;
        settle(1010).await;
        assert_eq!(count(&drain(&mut rx), ControllerEvent::NearEnd), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_video_resets_and_nudges_play() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        player.load_video("v2", 15).await;
        assert_eq!(host.backend.commands(), vec![Command::Load("v2".into(), 15)]);

        settle(1010).await;
        assert_eq!(
            host.backend.commands(),
            vec![Command::Load("v2".into(), 15), Command::Play]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cued_video_is_nudged() {
        let host = FakeHost::new();
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(5));
        settle(50).await;
        assert!(host.backend.commands().is_empty());
        settle(100).await;
        assert_eq!(host.backend.commands(), vec![Command::Play]);
        assert_eq!(
            drain(&mut rx),
            vec![ControllerEvent::StateChanged(PlayerState::Cued)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_forwarded() {
        let host = FakeHost::new();
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::Error(150));
        settle(10).await;
        assert_eq!(drain(&mut rx), vec![ControllerEvent::Error(150)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_uses_playing_flag() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        player.toggle_play_pause();
        host.send(PlayerEvent::StateChange(1));
        settle(10).await;
        player.toggle_play_pause();

        assert_eq!(host.backend.commands(), vec![Command::Play, Command::Pause]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_releases_player_and_cancels_timers() {
        let host = FakeHost::new();
        host.backend.set_position(10.0, 100.0);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(10).await;
        player.load_video("v2", 0).await;
        player.destroy();
        drain(&mut rx);

        settle(5000).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(
            host.backend.commands(),
            vec![Command::Load("v2".into(), 0), Command::Destroy]
        );
        assert!(!player.has_player());

        // Second teardown (and the Drop that follows) must not release twice
        player.destroy();
        drop(player);
        let destroys = host
            .backend
            .commands()
            .iter()
            .filter(|c| **c == Command::Destroy)
            .count();
        assert_eq!(destroys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_without_player_is_safe() {
        let host = FakeHost::new();
        let (mut player, _rx) = host.controller();
        player.initialize(surface(), None, 0, 100).await;
        player.destroy();
        player.load_video("v1", 0).await;
        assert!(!player.has_player());
    }

    #[tokio::test(start_paused = true)]
    async fn test_construction_failure_reports_error_and_retries() {
        let host = FakeHost::new();
        host.fail_construction.store(true, Ordering::SeqCst);
        let (mut player, mut rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;
        assert!(!player.has_player());
        player.play();
        assert_eq!(drain(&mut rx), vec![ControllerEvent::Error(CONSTRUCTION_FAILED)]);

        // Still failing: the surface stays parked
        player.load_video("v2", 0).await;
        assert_eq!(drain(&mut rx), vec![ControllerEvent::Error(CONSTRUCTION_FAILED)]);

        host.fail_construction.store(false, Ordering::SeqCst);
        player.load_video("v3", 0).await;
        assert!(player.has_player());
        assert_eq!(lock(&host.configs)[0].video_id, "v3");
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_video_resets_elapsed() {
        let host = FakeHost::new();
        host.backend.set_position(150.0, 300.0);
        let (mut player, _rx) = host.controller();
        player.initialize(surface(), Some("v1"), 0, 100).await;

        host.send(PlayerEvent::StateChange(1));
        settle(1300).await;
        assert_eq!(player.current_time(), 150.0);

        player.load_video("v2", 0).await;
        assert_eq!(player.current_time(), 0.0);
    }
}
