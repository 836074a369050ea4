use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Riyaz (practice) mode parameters: raise the tempo by `step_bpm` every
/// `interval_minutes`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PracticeSettings {
    pub enabled: bool,
    pub step_bpm: u32,
    pub interval_minutes: u32,
}

impl PracticeSettings {
    pub fn new(step_bpm: u32, interval_minutes: u32) -> Self {
        Self {
            enabled: false,
            step_bpm,
            interval_minutes,
        }
        .normalized()
    }

    /// Values below one are raised to one.
    pub fn normalized(self) -> Self {
        Self {
            enabled: self.enabled,
            step_bpm: self.step_bpm.max(1),
            interval_minutes: self.interval_minutes.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes.max(1)) * 60)
    }
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            step_bpm: 5,
            interval_minutes: 5,
        }
    }
}
