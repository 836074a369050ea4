use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_TEMPO: f64 = 1.0;
pub const MAX_TEMPO: f64 = 300.0;
pub const DEFAULT_TEMPO: f64 = 100.0;

/// Upper edge (exclusive) of the slow band.
const SLOW_BELOW: f64 = 70.0;
/// Upper edge (inclusive) of the medium band.
const MEDIUM_UP_TO: f64 = 130.0;

/// Laya: the coarse tempo category that selects which recording is used.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TempoBand {
    #[serde(rename = "vilambit")]
    Slow,
    #[serde(rename = "madhya")]
    Medium,
    #[serde(rename = "drut")]
    Fast,
}

impl TempoBand {
    pub const ALL: [TempoBand; 3] = [TempoBand::Slow, TempoBand::Medium, TempoBand::Fast];

    /// Partitions the tempo axis: `< 70` slow, `70..=130` medium, `> 130` fast.
    pub fn for_tempo(bpm: f64) -> Self {
        if bpm < SLOW_BELOW {
            TempoBand::Slow
        } else if bpm > MEDIUM_UP_TO {
            TempoBand::Fast
        } else {
            TempoBand::Medium
        }
    }

    /// Native tempo of the recordings made for this band.
    pub fn reference_tempo(self) -> f64 {
        match self {
            TempoBand::Slow => 40.0,
            TempoBand::Medium => 100.0,
            TempoBand::Fast => 150.0,
        }
    }

    /// Name used inside asset identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            TempoBand::Slow => "vilambit",
            TempoBand::Medium => "madhya",
            TempoBand::Fast => "drut",
        }
    }
}

impl fmt::Display for TempoBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn band_for(bpm: f64) -> TempoBand {
    TempoBand::for_tempo(bpm)
}

pub fn reference_tempo(band: TempoBand) -> f64 {
    band.reference_tempo()
}

/// Clamps a requested tempo into `[MIN_TEMPO, MAX_TEMPO]`; NaN falls back to the default.
pub fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return DEFAULT_TEMPO;
    }
    bpm.clamp(MIN_TEMPO, MAX_TEMPO)
}

pub fn seconds_per_beat(bpm: f64) -> f64 {
    60.0 / bpm
}
