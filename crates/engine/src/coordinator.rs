use std::sync::Arc;
use std::time::Duration;

use lehra_audio::{pitch_ratio, Accompaniment, AudioClip, LoadError, Player, PlayerState};
use lehra_domain::{
    band_for, clamp_tempo, pitch::key_name, AssetStatus, MeterTable, SessionConfig, VisualEvent,
};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{ClockEvent, ClockState, TransportClock};
use crate::error::EngineError;
use crate::practice::{PracticeController, PracticeState};
use crate::selector::{AssetSelector, Completion, LoadCompletion, LoadRequest};
use crate::sink::VisualSink;
use crate::state::PlaybackState;

/// Owns the playback session and wires the transport, asset selection and
/// practice mode to the player, the drone and the display.
///
/// Loads are not performed here: requests queue up in an outbox
/// ([`PlaybackCoordinator::drain_load_requests`]) and their results come back
/// through [`PlaybackCoordinator::on_load_complete`].
pub struct PlaybackCoordinator {
    meters: MeterTable,
    state: PlaybackState,
    clock: TransportClock,
    selector: AssetSelector,
    practice: PracticeController,
    player: Box<dyn Player>,
    accompaniment: Box<dyn Accompaniment>,
    sink: Box<dyn VisualSink>,
    outbox: Vec<LoadRequest>,
    flash_duration: Duration,
    flash_active: bool,
}

impl PlaybackCoordinator {
    pub fn new(
        config: &SessionConfig,
        player: Box<dyn Player>,
        accompaniment: Box<dyn Accompaniment>,
        sink: Box<dyn VisualSink>,
    ) -> Result<Self, EngineError> {
        let config = config.clone().validated()?;
        let meters = config.meter_table()?;
        let meter = meters.meter(&config.meter)?.clone();
        let mut state = PlaybackState::new(
            meter,
            config.mode.clone(),
            config.instrument.clone(),
            clamp_tempo(config.tempo),
        );
        state.accompaniment_enabled = config.accompaniment.enabled;
        state.accompaniment_volume_db = config.accompaniment.volume_db;

        let mut coordinator = Self {
            meters,
            clock: TransportClock::new(state.tempo, config.transport.timer_capacity),
            selector: AssetSelector::new(config.locator()),
            practice: PracticeController::new(config.practice),
            state,
            player,
            accompaniment,
            sink,
            outbox: Vec::new(),
            flash_duration: Duration::from_millis(config.transport.flash_millis),
            flash_active: false,
        };
        coordinator
            .accompaniment
            .set_volume(coordinator.state.accompaniment_volume_db);
        coordinator
            .player
            .set_playback_rate(coordinator.state.playback_rate());
        coordinator.set_pitch_shift(config.pitch_shift);
        coordinator.emit_layout();
        Ok(coordinator)
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn practice(&self) -> &PracticeState {
        self.practice.state()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn meters(&self) -> &MeterTable {
        &self.meters
    }

    pub fn selector(&self) -> &AssetSelector {
        &self.selector
    }

    /// Load requests issued since the last call. Only the newest one can
    /// still commit; older ones are dropped here already.
    pub fn drain_load_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.outbox)
    }

    #[instrument(skip(self))]
    pub fn play(&mut self) -> Result<(), EngineError> {
        if self.state.is_playing {
            return Ok(());
        }
        self.request_asset();
        self.clock.set_tempo(self.state.tempo);
        self.player.set_playback_rate(self.state.playback_rate());
        if let Err(err) = self
            .clock
            .start(self.state.meter.cycle_length, self.state.tempo)
        {
            error!(%err, "refusing to start playback");
            self.sink.emit(VisualEvent::Fault {
                message: err.to_string(),
            });
            return Err(err);
        }
        self.practice.reset_timer(self.clock.now());
        self.state.is_playing = true;
        self.state.cycle_position = 0;
        self.sync_accompaniment();
        info!(
            tempo = self.state.tempo,
            meter = %self.state.meter.id,
            "playback started"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        self.clock.stop();
        self.player.stop();
        let was_playing = self.state.is_playing;
        self.state.is_playing = false;
        self.state.cycle_position = 0;
        self.practice.cancel_pending();
        self.sync_accompaniment();
        if self.flash_active {
            self.flash_active = false;
            self.sink.emit(VisualEvent::Flash { active: false });
        }
        self.sink.emit(VisualEvent::Reset);
        if was_playing {
            info!("playback stopped");
        }
    }

    pub fn toggle(&mut self) -> Result<(), EngineError> {
        if self.state.is_playing {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Clamps to the tempo range, reloads when the band changes and re-anchors
    /// the playback rate to the active recording. Returns the applied tempo.
    #[instrument(skip(self))]
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        let tempo = clamp_tempo(bpm);
        self.state.tempo = tempo;
        let band = band_for(tempo);
        if self.needs_reload() {
            debug!(%band, active = %self.state.active_band, "tempo crossed into another band");
            self.request_asset();
        }
        self.player.set_playback_rate(self.state.playback_rate());
        self.clock.set_tempo(tempo);
        self.sink.emit(VisualEvent::Tempo { bpm: tempo, band });
        tempo
    }

    /// Switches taal. While playing, the loop is restarted at once so the new
    /// cycle length applies without waiting for sam.
    #[instrument(skip(self))]
    pub fn set_meter(&mut self, id: &str) -> Result<(), EngineError> {
        let meter = match self.meters.meter(id) {
            Ok(meter) => meter.clone(),
            Err(err) => {
                warn!(%id, "rejecting unknown meter");
                self.sink.emit(VisualEvent::Fault {
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };
        info!(meter = %meter.id, beats = meter.cycle_length, "meter changed");
        self.state.meter = meter;
        self.emit_layout();
        self.request_asset();
        if self.state.is_playing {
            if let Err(err) = self.clock.restart(self.state.meter.cycle_length) {
                error!(%err, "could not restart transport for new meter");
                self.stop();
                self.sink.emit(VisualEvent::Fault {
                    message: err.to_string(),
                });
                return Err(err);
            }
            self.state.cycle_position = 0;
            self.practice.reset_timer(self.clock.now());
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode_id: &str) {
        self.state.mode_id = mode_id.to_string();
        self.request_asset();
    }

    pub fn set_instrument(&mut self, instrument_id: &str) {
        self.state.instrument_id = instrument_id.to_string();
        self.request_asset();
    }

    pub fn set_pitch_shift(&mut self, semitones: i32) {
        self.state.pitch_shift = semitones;
        self.player.set_detune(semitones);
        self.accompaniment.set_playback_rate(pitch_ratio(semitones));
        self.sink.emit(VisualEvent::Key {
            semitones,
            name: key_name(semitones).to_string(),
        });
    }

    pub fn set_accompaniment_enabled(&mut self, enabled: bool) {
        self.state.accompaniment_enabled = enabled;
        self.sync_accompaniment();
    }

    pub fn set_accompaniment_buffer(&mut self, clip: Arc<AudioClip>) {
        self.accompaniment.set_buffer(clip);
    }

    pub fn set_accompaniment_volume(&mut self, db: f32) {
        self.state.accompaniment_volume_db = db;
        self.accompaniment.set_volume(db);
    }

    pub fn set_practice_enabled(&mut self, enabled: bool) {
        if enabled {
            self.practice.enable(self.clock.now());
        } else {
            self.practice.disable(self.sink.as_mut());
        }
    }

    pub fn set_practice_step(&mut self, step_bpm: u32) {
        self.practice.set_step(step_bpm);
    }

    pub fn set_practice_interval(&mut self, minutes: u32) {
        self.practice.set_interval_minutes(minutes);
    }

    /// Moves the transport forward by `elapsed`, handling every timer that
    /// comes due in order.
    pub fn advance(&mut self, elapsed: Duration) {
        let until = self.clock.seconds() + elapsed.as_secs_f64();
        while let Some(event) = self.clock.poll(until) {
            match event {
                ClockEvent::Tick => {
                    let outcome = self.clock.on_tick(&mut self.practice, self.sink.as_mut());
                    self.state.cycle_position = outcome.position;
                    if outcome.commit_increase {
                        self.commit_practice_increase();
                    }
                }
                ClockEvent::LoopRetrigger { at } => {
                    debug!(?at, "retriggering lehra loop");
                    self.player.start(at);
                }
                ClockEvent::FlashElapsed => {
                    self.flash_active = false;
                    self.sink.emit(VisualEvent::Flash { active: false });
                }
            }
        }
    }

    pub fn on_load_complete(&mut self, completion: LoadCompletion) {
        match self.selector.complete(completion) {
            Completion::Loaded {
                key,
                file_name,
                clip,
                reference_tempo,
            } => {
                self.state.active_band = key.band;
                self.state.active_reference_tempo = reference_tempo;
                self.player.set_buffer(clip);
                self.player.set_playback_rate(self.state.playback_rate());
                self.sink.emit(VisualEvent::Asset(AssetStatus::Playing {
                    file: file_name,
                    reference_tempo,
                }));
            }
            Completion::NotFound {
                file_name, error, ..
            } => {
                // previous buffer stays in the player and keeps looping
                let status = match error {
                    LoadError::NotFound(_) => AssetStatus::Missing { file: file_name },
                    other => AssetStatus::Failed {
                        file: file_name,
                        reason: other.to_string(),
                    },
                };
                self.sink.emit(VisualEvent::Asset(status));
            }
            Completion::Stale { id } => {
                debug!(?id, "stale load ignored");
            }
        }
    }

    fn commit_practice_increase(&mut self) {
        let from = self.state.tempo;
        let to = self.practice.apply_increase(from, self.clock.now());
        info!(from, to, "practice tempo increase committed at sam");
        self.set_tempo(to);
        self.flash();
    }

    fn flash(&mut self) {
        self.flash_active = true;
        self.sink.emit(VisualEvent::Flash { active: true });
        if let Err(err) = self.clock.schedule_flash(self.flash_duration) {
            warn!(%err, "flash timer unavailable, clearing immediately");
            self.flash_active = false;
            self.sink.emit(VisualEvent::Flash { active: false });
        }
    }

    /// A reload is needed when the selection no longer matches what is
    /// loading, or, with nothing loading, when the band left the active one.
    fn needs_reload(&self) -> bool {
        let desired = self.state.desired_key();
        match self.selector.in_flight() {
            Some(request) => request.key != desired,
            None => desired.band != self.state.active_band,
        }
    }

    fn request_asset(&mut self) {
        let request = self.selector.request(self.state.desired_key());
        info!(file = %request.file_name, "requesting lehra asset");
        self.sink.emit(VisualEvent::Asset(AssetStatus::Loading {
            file: request.file_name.clone(),
        }));
        self.outbox.clear();
        self.outbox.push(request);
    }

    fn sync_accompaniment(&mut self) {
        let should_run = self.state.accompaniment_enabled && self.state.is_playing;
        match (should_run, self.accompaniment.state()) {
            (true, PlayerState::Stopped) => self.accompaniment.start(),
            (false, PlayerState::Started) => self.accompaniment.stop(),
            _ => {}
        }
    }

    fn emit_layout(&mut self) {
        self.sink.emit(VisualEvent::Layout {
            meter_id: self.state.meter.id.clone(),
            beats: self.state.meter.layout(),
        });
    }
}
