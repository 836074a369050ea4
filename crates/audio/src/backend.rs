use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::dsp::{db_to_gain, semitones_to_cents};
use crate::io::AudioClip;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Started,
}

/// The lehra playback engine. Detune and rate are independent: a granular
/// engine can change speed without changing pitch.
pub trait Player: Send {
    fn set_buffer(&mut self, clip: Arc<AudioClip>);
    /// (Re)starts the buffer from its beginning at transport time `at`.
    fn start(&mut self, at: Duration);
    fn stop(&mut self);
    fn set_detune(&mut self, semitones: i32);
    fn set_playback_rate(&mut self, ratio: f64);
    fn state(&self) -> PlayerState;
}

/// The tanpura drone: an independent looping track.
pub trait Accompaniment: Send {
    fn set_buffer(&mut self, clip: Arc<AudioClip>);
    fn start(&mut self);
    fn stop(&mut self);
    fn state(&self) -> PlayerState;
    fn set_volume(&mut self, db: f32);
    fn set_playback_rate(&mut self, ratio: f64);
}

/// Stand-in player for headless runs; tracks state and logs calls.
#[derive(Debug)]
pub struct NullPlayer {
    state: PlayerState,
    clip: Option<Arc<AudioClip>>,
    playback_rate: f64,
    detune: i32,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Stopped,
            clip: None,
            playback_rate: 1.0,
            detune: 0,
        }
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn detune(&self) -> i32 {
        self.detune
    }

    pub fn has_buffer(&self) -> bool {
        self.clip.is_some()
    }
}

impl Default for NullPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for NullPlayer {
    fn set_buffer(&mut self, clip: Arc<AudioClip>) {
        debug!(duration = ?clip.duration(), "swapping lehra buffer");
        self.clip = Some(clip);
    }

    fn start(&mut self, at: Duration) {
        debug!(?at, rate = self.playback_rate, "lehra start");
        self.state = PlayerState::Started;
    }

    fn stop(&mut self) {
        debug!("lehra stop");
        self.state = PlayerState::Stopped;
    }

    fn set_detune(&mut self, semitones: i32) {
        debug!(cents = semitones_to_cents(semitones), "lehra detune");
        self.detune = semitones;
    }

    fn set_playback_rate(&mut self, ratio: f64) {
        self.playback_rate = ratio;
    }

    fn state(&self) -> PlayerState {
        self.state
    }
}

#[derive(Debug)]
pub struct NullAccompaniment {
    state: PlayerState,
    clip: Option<Arc<AudioClip>>,
    volume_db: f32,
    playback_rate: f64,
}

impl NullAccompaniment {
    pub fn new(volume_db: f32) -> Self {
        Self {
            state: PlayerState::Stopped,
            clip: None,
            volume_db,
            playback_rate: 1.0,
        }
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn has_buffer(&self) -> bool {
        self.clip.is_some()
    }
}

impl Accompaniment for NullAccompaniment {
    fn set_buffer(&mut self, clip: Arc<AudioClip>) {
        debug!(duration = ?clip.duration(), "tanpura buffer loaded");
        self.clip = Some(clip);
    }

    fn start(&mut self) {
        debug!(
            volume_db = self.volume_db,
            gain = db_to_gain(self.volume_db),
            "tanpura start"
        );
        self.state = PlayerState::Started;
    }

    fn stop(&mut self) {
        debug!("tanpura stop");
        self.state = PlayerState::Stopped;
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn set_volume(&mut self, db: f32) {
        self.volume_db = db;
    }

    fn set_playback_rate(&mut self, ratio: f64) {
        self.playback_rate = ratio;
    }
}
