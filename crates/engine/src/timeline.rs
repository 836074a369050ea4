//! Musical timeline: a transport position in beats advanced by wall-clock
//! seconds at the current tempo, with repeating timers expressed in beats and
//! one-shot timers expressed in seconds.
//!
//! Nothing fires on its own. The owner asks for the next due timer up to some
//! horizon with [`Timeline::next_fire`], handles it (possibly changing the
//! tempo), and asks again. Tempo changes therefore apply from the exact moment
//! they are made.

use std::time::Duration;

use lehra_domain::clamp_tempo;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScheduleError {
    #[error("timer capacity of {0} registrations exhausted")]
    CapacityExhausted(usize),
    #[error("repeat interval must be a positive number of beats, got {0}")]
    InvalidInterval(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Due {
    Beat(f64),
    Second(f64),
}

#[derive(Debug)]
struct Registration {
    token: TimerToken,
    due: Due,
    interval_beats: Option<f64>,
}

/// A timer that came due, stamped with the transport position it fired at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fired {
    pub token: TimerToken,
    pub beat: f64,
    pub seconds: f64,
}

#[derive(Debug)]
pub struct Timeline {
    bpm: f64,
    beat: f64,
    seconds: f64,
    running: bool,
    registrations: Vec<Registration>,
    next_token: u64,
    capacity: usize,
}

impl Timeline {
    pub fn new(bpm: f64, capacity: usize) -> Self {
        Self {
            bpm: clamp_tempo(bpm),
            beat: 0.0,
            seconds: 0.0,
            running: false,
            registrations: Vec::new(),
            next_token: 0,
            capacity,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_tempo(bpm);
    }

    pub fn beat(&self) -> f64 {
        self.beat
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Halts and rewinds to zero. Registrations are left for the owner to clear.
    pub fn stop(&mut self) {
        self.running = false;
        self.beat = 0.0;
        self.seconds = 0.0;
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn schedule_repeat(
        &mut self,
        interval_beats: f64,
        start_beat: f64,
    ) -> Result<TimerToken, ScheduleError> {
        if interval_beats <= 0.0 || !interval_beats.is_finite() {
            return Err(ScheduleError::InvalidInterval(interval_beats));
        }
        self.register(Due::Beat(start_beat.max(0.0)), Some(interval_beats))
    }

    pub fn schedule_once(&mut self, delay: Duration) -> Result<TimerToken, ScheduleError> {
        self.register(Due::Second(self.seconds + delay.as_secs_f64()), None)
    }

    pub fn clear(&mut self, token: TimerToken) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.token != token);
        before != self.registrations.len()
    }

    /// Returns the earliest timer due at or before `until_seconds`, moving the
    /// transport to that instant. When nothing is due the transport moves to
    /// `until_seconds` and `None` is returned. Ties fire in registration order.
    pub fn next_fire(&mut self, until_seconds: f64) -> Option<Fired> {
        if !self.running {
            return None;
        }
        let next = self
            .registrations
            .iter()
            .enumerate()
            .map(|(index, registration)| (index, self.due_at(registration.due)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match next {
            Some((index, at)) if at <= until_seconds => {
                self.move_to(at);
                let token = self.registrations[index].token;
                match self.registrations[index].interval_beats {
                    Some(interval) => {
                        if let Due::Beat(due) = self.registrations[index].due {
                            // snap to the grid so float error never accumulates
                            self.beat = self.beat.max(due);
                            self.registrations[index].due = Due::Beat(due + interval);
                        }
                    }
                    None => {
                        self.registrations.remove(index);
                    }
                }
                Some(Fired {
                    token,
                    beat: self.beat,
                    seconds: self.seconds,
                })
            }
            _ => {
                self.move_to(until_seconds);
                None
            }
        }
    }

    fn register(
        &mut self,
        due: Due,
        interval_beats: Option<f64>,
    ) -> Result<TimerToken, ScheduleError> {
        if self.registrations.len() >= self.capacity {
            return Err(ScheduleError::CapacityExhausted(self.capacity));
        }
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.registrations.push(Registration {
            token,
            due,
            interval_beats,
        });
        Ok(token)
    }

    fn due_at(&self, due: Due) -> f64 {
        match due {
            Due::Beat(beat) => self.seconds + (beat - self.beat).max(0.0) * 60.0 / self.bpm,
            Due::Second(seconds) => seconds.max(self.seconds),
        }
    }

    fn move_to(&mut self, seconds: f64) {
        if seconds > self.seconds {
            self.beat += (seconds - self.seconds) * self.bpm / 60.0;
            self.seconds = seconds;
        }
    }
}
