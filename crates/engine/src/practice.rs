//! Riyaz mode: asks for a tempo increase once the interval has elapsed and
//! leaves the actual bump to the transport, which commits it on the next sam.

use std::time::Duration;

use lehra_domain::{tempo::MAX_TEMPO, PracticeSettings, PracticeStatus, VisualEvent};
use tracing::{debug, info};

use crate::sink::VisualSink;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeState {
    pub enabled: bool,
    pub step_bpm: u32,
    pub interval: Duration,
    /// Transport time of the last jump (or of enabling/starting).
    pub last_jump: Duration,
    pub pending_increase: bool,
}

#[derive(Debug)]
pub struct PracticeController {
    state: PracticeState,
}

impl PracticeController {
    pub fn new(settings: PracticeSettings) -> Self {
        let settings = settings.normalized();
        Self {
            state: PracticeState {
                enabled: settings.enabled,
                step_bpm: settings.step_bpm,
                interval: settings.interval(),
                last_jump: Duration::ZERO,
                pending_increase: false,
            },
        }
    }

    pub fn state(&self) -> &PracticeState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending_increase
    }

    pub fn enable(&mut self, now: Duration) {
        info!(
            step = self.state.step_bpm,
            interval_secs = self.state.interval.as_secs(),
            "practice mode enabled"
        );
        self.state.enabled = true;
        self.state.last_jump = now;
    }

    pub fn disable(&mut self, sink: &mut dyn VisualSink) {
        info!("practice mode disabled");
        self.state.enabled = false;
        self.state.pending_increase = false;
        sink.emit(VisualEvent::Practice(PracticeStatus::Cleared));
    }

    pub fn set_step(&mut self, step_bpm: u32) {
        self.state.step_bpm = step_bpm.max(1);
    }

    pub fn set_interval_minutes(&mut self, minutes: u32) {
        self.state.interval = Duration::from_secs(u64::from(minutes.max(1)) * 60);
    }

    /// Restarts the countdown, e.g. when the transport is rewound.
    pub fn reset_timer(&mut self, now: Duration) {
        self.state.last_jump = now;
    }

    /// Drops an outstanding request without applying it.
    pub fn cancel_pending(&mut self) {
        self.state.pending_increase = false;
    }

    pub fn on_beat(&mut self, now: Duration, playing: bool, sink: &mut dyn VisualSink) {
        if !self.state.enabled || !playing || self.state.pending_increase {
            return;
        }
        let elapsed = now.saturating_sub(self.state.last_jump);
        if elapsed >= self.state.interval {
            debug!(?elapsed, "practice interval elapsed, jump requested");
            self.state.pending_increase = true;
            sink.emit(VisualEvent::Practice(PracticeStatus::JumpAtNextSam));
        } else {
            let remaining = self.state.interval - elapsed;
            sink.emit(VisualEvent::Practice(PracticeStatus::Countdown {
                remaining_secs: remaining.as_secs(),
            }));
        }
    }

    /// Clears the request and returns the raised tempo, capped at the maximum.
    pub fn apply_increase(&mut self, tempo: f64, now: Duration) -> f64 {
        self.state.pending_increase = false;
        self.state.last_jump = now;
        (tempo + f64::from(self.state.step_bpm)).min(MAX_TEMPO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn controller(step: u32, minutes: u32) -> PracticeController {
        let mut practice = PracticeController::new(PracticeSettings::new(step, minutes));
        practice.enable(Duration::ZERO);
        practice
    }

    #[test]
    fn inert_until_enabled() {
        let mut practice = PracticeController::new(PracticeSettings::new(5, 1));
        let mut sink = RecordingSink::new();
        practice.on_beat(Duration::from_secs(600), true, &mut sink);
        assert!(!practice.is_pending());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn counts_down_then_requests() {
        let mut practice = controller(5, 1);
        let mut sink = RecordingSink::new();
        practice.on_beat(Duration::from_millis(54_500), true, &mut sink);
        assert!(!practice.is_pending());
        assert_eq!(
            sink.take(),
            vec![VisualEvent::Practice(PracticeStatus::Countdown { remaining_secs: 5 })]
        );

        practice.on_beat(Duration::from_secs(60), true, &mut sink);
        assert!(practice.is_pending());
        assert_eq!(
            sink.take(),
            vec![VisualEvent::Practice(PracticeStatus::JumpAtNextSam)]
        );

        // already pending: quiet
        practice.on_beat(Duration::from_secs(61), true, &mut sink);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn not_playing_never_requests() {
        let mut practice = controller(5, 1);
        let mut sink = RecordingSink::new();
        practice.on_beat(Duration::from_secs(120), false, &mut sink);
        assert!(!practice.is_pending());
    }

    #[test]
    fn apply_clears_request_and_caps() {
        let mut practice = controller(5, 1);
        let mut sink = RecordingSink::new();
        practice.on_beat(Duration::from_secs(60), true, &mut sink);
        assert_eq!(practice.apply_increase(100.0, Duration::from_secs(61)), 105.0);
        assert!(!practice.is_pending());
        assert_eq!(practice.state().last_jump, Duration::from_secs(61));
        assert_eq!(practice.apply_increase(298.0, Duration::from_secs(62)), 300.0);
        assert_eq!(practice.apply_increase(300.0, Duration::from_secs(63)), 300.0);
    }

    #[test]
    fn disable_clears_pending_and_status() {
        let mut practice = controller(5, 1);
        let mut sink = RecordingSink::new();
        practice.on_beat(Duration::from_secs(60), true, &mut sink);
        sink.take();
        practice.disable(&mut sink);
        assert!(!practice.is_pending());
        assert!(!practice.is_enabled());
        assert_eq!(
            sink.events(),
            vec![VisualEvent::Practice(PracticeStatus::Cleared)]
        );
    }

    #[test]
    fn settings_minimums() {
        let mut practice = controller(5, 1);
        practice.set_step(0);
        practice.set_interval_minutes(0);
        assert_eq!(practice.state().step_bpm, 1);
        assert_eq!(practice.state().interval, Duration::from_secs(60));
    }
}
