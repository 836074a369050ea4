use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{meter::BeatMark, tempo::TempoBand, DomainError};

/// Progress of the lehra recording currently being swapped in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssetStatus {
    Loading { file: String },
    Playing { file: String, reference_tempo: f64 },
    Missing { file: String },
    Failed { file: String, reason: String },
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetStatus::Loading { file } => write!(f, "Loading: {}...", file),
            AssetStatus::Playing {
                file,
                reference_tempo,
            } => write!(f, "Playing: {} (Base: {})", file, reference_tempo),
            AssetStatus::Missing { file } => write!(f, "Error: Missing file {}", file),
            AssetStatus::Failed { file, reason } => {
                write!(f, "Error: Could not load {} ({})", file, reason)
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PracticeStatus {
    Countdown { remaining_secs: u64 },
    JumpAtNextSam,
    Cleared,
}

impl fmt::Display for PracticeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeStatus::Countdown { remaining_secs } => write!(
                f,
                "Next Jump: {}:{:02}",
                remaining_secs / 60,
                remaining_secs % 60
            ),
            PracticeStatus::JumpAtNextSam => f.write_str("Jump at next Sam..."),
            PracticeStatus::Cleared => Ok(()),
        }
    }
}

/// Everything the beat display and status labels need to know about.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VisualEvent {
    Layout { meter_id: String, beats: Vec<BeatMark> },
    BeatChanged { index: u32 },
    CycleBoundary,
    /// Playback stopped: no active beat, matra display back to 1.
    Reset,
    Asset(AssetStatus),
    Practice(PracticeStatus),
    Tempo { bpm: f64, band: TempoBand },
    Key { semitones: i32, name: String },
    Flash { active: bool },
    /// A rejected command or a failed session, shown as status text.
    Fault { message: String },
}

impl VisualEvent {
    /// 1-based matra number shown next to the circle.
    pub fn matra(&self) -> Option<u32> {
        match self {
            VisualEvent::BeatChanged { index } => Some(index + 1),
            VisualEvent::Reset => Some(1),
            _ => None,
        }
    }

    pub fn to_json_line(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|err| DomainError::Serialization(err.to_string()))
    }
}
