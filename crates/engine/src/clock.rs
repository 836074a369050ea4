//! Transport clock: cycle position, per-beat ticks and the lehra loop trigger.

use std::time::Duration;

use lehra_domain::VisualEvent;
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::practice::PracticeController;
use crate::sink::VisualSink;
use crate::timeline::{ScheduleError, Timeline, TimerToken};

/// Ticks per beat; the tick unit is the beat itself.
const TICK_INTERVAL_BEATS: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockEvent {
    Tick,
    /// Restart the lehra; `at` is the transport time of the cycle start.
    LoopRetrigger { at: Duration },
    FlashElapsed,
}

/// What one tick decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    pub position: u32,
    pub cycle_boundary: bool,
    /// A pending practice increase must be committed now.
    pub commit_increase: bool,
}

#[derive(Debug)]
pub struct TransportClock {
    state: ClockState,
    timeline: Timeline,
    tick: Option<TimerToken>,
    loop_trigger: Option<TimerToken>,
    flash: Option<TimerToken>,
    total_beats: u64,
    cycle_length: u32,
    position: u32,
}

impl TransportClock {
    pub fn new(bpm: f64, timer_capacity: usize) -> Self {
        Self {
            state: ClockState::Stopped,
            timeline: Timeline::new(bpm, timer_capacity),
            tick: None,
            loop_trigger: None,
            flash: None,
            total_beats: 0,
            cycle_length: 1,
            position: 0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    pub fn bpm(&self) -> f64 {
        self.timeline.bpm()
    }

    /// Transport seconds since start.
    pub fn seconds(&self) -> f64 {
        self.timeline.seconds()
    }

    pub fn now(&self) -> Duration {
        Duration::from_secs_f64(self.timeline.seconds())
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.timeline.set_bpm(bpm);
    }

    /// Number of live timer registrations (tick, loop trigger, flash).
    pub fn registrations(&self) -> usize {
        self.timeline.len()
    }

    pub fn start(&mut self, cycle_length: u32, bpm: f64) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        self.timeline.stop();
        self.timeline.set_bpm(bpm);
        self.total_beats = 0;
        self.position = 0;
        self.cycle_length = cycle_length.max(1);

        if let Err(err) = self.schedule_timers() {
            error!(%err, "transport could not schedule its timers");
            self.cancel_timers();
            return Err(EngineError::SchedulingFailure(err.to_string()));
        }

        self.timeline.start();
        self.state = ClockState::Running;
        info!(
            cycle_length = self.cycle_length,
            bpm = self.timeline.bpm(),
            "transport started"
        );
        Ok(())
    }

    /// Cancels every timer before returning; nothing fires afterwards.
    pub fn stop(&mut self) {
        self.cancel_timers();
        self.timeline.stop();
        self.total_beats = 0;
        self.position = 0;
        if self.state == ClockState::Running {
            info!("transport stopped");
        }
        self.state = ClockState::Stopped;
    }

    /// Applies a new cycle length immediately: rewind, replace the loop
    /// trigger and start again at the current tempo.
    pub fn restart(&mut self, cycle_length: u32) -> Result<(), EngineError> {
        let bpm = self.timeline.bpm();
        self.stop();
        self.start(cycle_length, bpm)
    }

    /// One-shot timer for the tempo-jump flash; replaces any earlier one.
    pub fn schedule_flash(&mut self, after: Duration) -> Result<(), EngineError> {
        if let Some(token) = self.flash.take() {
            self.timeline.clear(token);
        }
        let token = self
            .timeline
            .schedule_once(after)
            .map_err(|err| EngineError::SchedulingFailure(err.to_string()))?;
        self.flash = Some(token);
        Ok(())
    }

    /// Next clock event due at or before transport time `until_seconds`.
    pub fn poll(&mut self, until_seconds: f64) -> Option<ClockEvent> {
        if !self.is_running() {
            return None;
        }
        loop {
            let fired = self.timeline.next_fire(until_seconds)?;
            if Some(fired.token) == self.tick {
                return Some(ClockEvent::Tick);
            }
            if Some(fired.token) == self.loop_trigger {
                return Some(ClockEvent::LoopRetrigger {
                    at: Duration::from_secs_f64(fired.seconds),
                });
            }
            if Some(fired.token) == self.flash {
                self.flash = None;
                return Some(ClockEvent::FlashElapsed);
            }
            debug!(token = ?fired.token, "dropping orphaned timer");
            self.timeline.clear(fired.token);
        }
    }

    /// The per-tick procedure: advance the cycle, report the beat, let
    /// practice mode look at it, and on sam decide whether a pending tempo
    /// increase commits now.
    pub fn on_tick(
        &mut self,
        practice: &mut PracticeController,
        sink: &mut dyn VisualSink,
    ) -> TickOutcome {
        let position = (self.total_beats % u64::from(self.cycle_length)) as u32;
        self.total_beats += 1;
        self.position = position;

        sink.emit(VisualEvent::BeatChanged { index: position });
        practice.on_beat(self.now(), self.is_running(), sink);

        let cycle_boundary = position == 0;
        let mut commit_increase = false;
        if cycle_boundary {
            sink.emit(VisualEvent::CycleBoundary);
            commit_increase = practice.is_pending();
        }
        TickOutcome {
            position,
            cycle_boundary,
            commit_increase,
        }
    }

    fn schedule_timers(&mut self) -> Result<(), ScheduleError> {
        self.tick = Some(self.timeline.schedule_repeat(TICK_INTERVAL_BEATS, 0.0)?);
        self.install_loop_trigger()
    }

    fn install_loop_trigger(&mut self) -> Result<(), ScheduleError> {
        if let Some(token) = self.loop_trigger.take() {
            self.timeline.clear(token);
        }
        let token = self
            .timeline
            .schedule_repeat(f64::from(self.cycle_length), 0.0)?;
        self.loop_trigger = Some(token);
        Ok(())
    }

    fn cancel_timers(&mut self) {
        for token in [self.tick.take(), self.loop_trigger.take(), self.flash.take()]
            .into_iter()
            .flatten()
        {
            self.timeline.clear(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use lehra_domain::PracticeSettings;

    fn run(
        clock: &mut TransportClock,
        practice: &mut PracticeController,
        sink: &mut RecordingSink,
        seconds: f64,
    ) -> Vec<ClockEvent> {
        let until = clock.seconds() + seconds;
        let mut events = Vec::new();
        while let Some(event) = clock.poll(until) {
            if event == ClockEvent::Tick {
                clock.on_tick(practice, sink);
            }
            events.push(event);
        }
        events
    }

    #[test]
    fn cycle_positions_wrap_in_order() {
        for cycle_length in [6u32, 7, 16] {
            let mut clock = TransportClock::new(60.0, 8);
            let mut practice = PracticeController::new(PracticeSettings::default());
            let mut sink = RecordingSink::new();
            clock.start(cycle_length, 60.0).unwrap();
            // 40 beats at one beat per second
            run(&mut clock, &mut practice, &mut sink, 39.5);
            let expected: Vec<u32> = (0..40).map(|n| n % cycle_length).collect();
            assert_eq!(sink.beat_indices(), expected);
        }
    }

    #[test]
    fn cycle_boundary_follows_each_sam() {
        let mut clock = TransportClock::new(120.0, 8);
        let mut practice = PracticeController::new(PracticeSettings::default());
        let mut sink = RecordingSink::new();
        clock.start(4, 120.0).unwrap();
        run(&mut clock, &mut practice, &mut sink, 4.2);
        let events = sink.events();
        for (index, event) in events.iter().enumerate() {
            if *event == VisualEvent::CycleBoundary {
                assert_eq!(events[index - 1], VisualEvent::BeatChanged { index: 0 });
            }
        }
        let boundaries = events
            .iter()
            .filter(|e| **e == VisualEvent::CycleBoundary)
            .count();
        // beats 0..=8 at 0.5 s, sams at beats 0, 4 and 8
        assert_eq!(boundaries, 3);
    }

    #[test]
    fn loop_retriggers_once_per_cycle() {
        let mut clock = TransportClock::new(60.0, 8);
        let mut practice = PracticeController::new(PracticeSettings::default());
        let mut sink = RecordingSink::new();
        clock.start(16, 60.0).unwrap();
        let events = run(&mut clock, &mut practice, &mut sink, 40.0);
        let triggers: Vec<Duration> = events
            .iter()
            .filter_map(|event| match event {
                ClockEvent::LoopRetrigger { at } => Some(*at),
                _ => None,
            })
            .collect();
        assert_eq!(
            triggers,
            vec![
                Duration::ZERO,
                Duration::from_secs(16),
                Duration::from_secs(32)
            ]
        );
    }

    #[test]
    fn stop_silences_everything() {
        let mut clock = TransportClock::new(100.0, 8);
        let mut practice = PracticeController::new(PracticeSettings::default());
        let mut sink = RecordingSink::new();
        clock.start(16, 100.0).unwrap();
        clock.schedule_flash(Duration::from_millis(500)).unwrap();
        run(&mut clock, &mut practice, &mut sink, 0.2);
        clock.stop();
        sink.take();
        assert_eq!(clock.registrations(), 0);
        assert!(run(&mut clock, &mut practice, &mut sink, 120.0).is_empty());
        assert!(sink.events().is_empty());
        assert_eq!(clock.position(), 0);
    }

    #[test]
    fn restart_keeps_single_loop_registration() {
        let mut clock = TransportClock::new(100.0, 8);
        clock.start(16, 100.0).unwrap();
        assert_eq!(clock.registrations(), 2);
        clock.restart(7).unwrap();
        clock.restart(10).unwrap();
        assert_eq!(clock.registrations(), 2);
        assert_eq!(clock.cycle_length(), 10);
        assert!(clock.is_running());
    }

    #[test]
    fn scheduling_failure_leaves_clock_stopped() {
        let mut clock = TransportClock::new(100.0, 1);
        let err = clock.start(16, 100.0).unwrap_err();
        assert!(matches!(err, EngineError::SchedulingFailure(_)));
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.registrations(), 0);
        assert!(clock.poll(100.0).is_none());
    }

    #[test]
    fn commit_only_reported_on_sam() {
        let mut clock = TransportClock::new(60.0, 8);
        let mut practice = PracticeController::new(PracticeSettings::new(5, 1));
        practice.enable(Duration::ZERO);
        let mut sink = RecordingSink::new();
        clock.start(16, 60.0).unwrap();
        let mut outcomes = Vec::new();
        let until = 70.5;
        while let Some(event) = clock.poll(until) {
            if event == ClockEvent::Tick {
                outcomes.push(clock.on_tick(&mut practice, &mut sink));
            }
        }
        // request raised at beat 60 (position 12); sam arrives at beat 64
        let commits: Vec<&TickOutcome> = outcomes.iter().filter(|o| o.commit_increase).collect();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].position, 0);
        assert!(practice.is_pending());
        assert_eq!(outcomes[60].position, 12);
    }
}
