use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lehra_audio::{Accompaniment, AssetLoader, AudioClip, LoadError, Player, PlayerState};
use lehra_domain::SessionConfig;

use crate::coordinator::PlaybackCoordinator;
use crate::selector::LoadCompletion;
use crate::sink::RecordingSink;

pub fn clip() -> Arc<AudioClip> {
    Arc::new(AudioClip {
        sample_rate: 8_000,
        channels: 1,
        samples: vec![0.0; 800],
    })
}

#[derive(Default)]
struct LoaderLog {
    missing: HashSet<String>,
    requested: Vec<String>,
}

/// Serves a silent clip for every location except the ones marked missing.
#[derive(Clone, Default)]
pub struct FakeLoader {
    log: Arc<Mutex<LoaderLog>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(&self, location: &str) {
        self.lock().missing.insert(location.to_string());
    }

    pub fn requested(&self) -> Vec<String> {
        self.lock().requested.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoaderLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AssetLoader for FakeLoader {
    async fn load(&self, location: &str) -> Result<Arc<AudioClip>, LoadError> {
        let mut log = self.lock();
        log.requested.push(location.to_string());
        if log.missing.contains(location) {
            Err(LoadError::NotFound(location.to_string()))
        } else {
            Ok(clip())
        }
    }
}

#[derive(Debug)]
struct PlayerLog {
    state: PlayerState,
    buffers: usize,
    starts: Vec<Duration>,
    detune: i32,
    rate: f64,
    volume: f32,
}

impl Default for PlayerLog {
    fn default() -> Self {
        Self {
            state: PlayerState::Stopped,
            buffers: 0,
            starts: Vec::new(),
            detune: 0,
            rate: 1.0,
            volume: 0.0,
        }
    }
}

/// Player and drone double; clones share one log so a test can keep a
/// handle after boxing one into the coordinator.
#[derive(Clone, Default)]
pub struct FakeOutput {
    log: Arc<Mutex<PlayerLog>>,
}

impl FakeOutput {
    fn lock(&self) -> std::sync::MutexGuard<'_, PlayerLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PlayerState {
        self.lock().state
    }

    pub fn buffers(&self) -> usize {
        self.lock().buffers
    }

    pub fn starts(&self) -> Vec<Duration> {
        self.lock().starts.clone()
    }

    pub fn detune(&self) -> i32 {
        self.lock().detune
    }

    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }
}

impl Player for FakeOutput {
    fn set_buffer(&mut self, _clip: Arc<AudioClip>) {
        self.lock().buffers += 1;
    }

    fn start(&mut self, at: Duration) {
        let mut log = self.lock();
        log.state = PlayerState::Started;
        log.starts.push(at);
    }

    fn stop(&mut self) {
        self.lock().state = PlayerState::Stopped;
    }

    fn set_detune(&mut self, semitones: i32) {
        self.lock().detune = semitones;
    }

    fn set_playback_rate(&mut self, ratio: f64) {
        self.lock().rate = ratio;
    }

    fn state(&self) -> PlayerState {
        self.lock().state
    }
}

impl Accompaniment for FakeOutput {
    fn set_buffer(&mut self, _clip: Arc<AudioClip>) {
        self.lock().buffers += 1;
    }

    fn start(&mut self) {
        self.lock().state = PlayerState::Started;
    }

    fn stop(&mut self) {
        self.lock().state = PlayerState::Stopped;
    }

    fn state(&self) -> PlayerState {
        self.lock().state
    }

    fn set_volume(&mut self, db: f32) {
        self.lock().volume = db;
    }

    fn set_playback_rate(&mut self, ratio: f64) {
        self.lock().rate = ratio;
    }
}

/// A coordinator wired to recording doubles.
pub struct Harness {
    pub coordinator: PlaybackCoordinator,
    pub player: FakeOutput,
    pub drone: FakeOutput,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        let player = FakeOutput::default();
        let drone = FakeOutput::default();
        let sink = RecordingSink::new();
        let coordinator = PlaybackCoordinator::new(
            &config,
            Box::new(player.clone()),
            Box::new(drone.clone()),
            Box::new(sink.clone()),
        )
        .expect("valid test config");
        Self {
            coordinator,
            player,
            drone,
            sink,
        }
    }

    /// Completes every queued load successfully.
    pub fn complete_all_ok(&mut self) {
        for request in self.coordinator.drain_load_requests() {
            self.coordinator.on_load_complete(LoadCompletion {
                request,
                result: Ok(clip()),
            });
        }
    }
}
