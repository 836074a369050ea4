use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    asset::{DirectoryLocator, DEFAULT_ASSET_EXTENSION, DEFAULT_ASSET_ROOT},
    meter::{Meter, MeterTable, DEFAULT_METER},
    practice::PracticeSettings,
    tempo::{clamp_tempo, DEFAULT_TEMPO},
    DomainError,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccompanimentSettings {
    pub enabled: bool,
    pub volume_db: f32,
    pub location: String,
}

impl Default for AccompanimentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            volume_db: -10.0,
            location: format!("{}/tanpura_drone.mp3", DEFAULT_ASSET_ROOT),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportSettings {
    /// Maximum timer registrations the scheduler will hold at once.
    pub timer_capacity: usize,
    pub flash_millis: u64,
    /// How often the session driver advances the transport.
    pub resolution_millis: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timer_capacity: 8,
            flash_millis: 500,
            resolution_millis: 5,
        }
    }
}

/// Startup configuration. Read once; nothing is written back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub tempo: f64,
    pub meter: String,
    pub mode: String,
    pub instrument: String,
    pub pitch_shift: i32,
    pub asset_root: String,
    pub asset_extension: String,
    pub practice: PracticeSettings,
    pub accompaniment: AccompanimentSettings,
    pub transport: TransportSettings,
    /// Replaces the built-in meter table when non-empty.
    pub meters: Vec<Meter>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            meter: DEFAULT_METER.to_string(),
            mode: "kirwani".to_string(),
            instrument: "santoor".to_string(),
            pitch_shift: 0,
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            asset_extension: DEFAULT_ASSET_EXTENSION.to_string(),
            practice: PracticeSettings::default(),
            accompaniment: AccompanimentSettings::default(),
            transport: TransportSettings::default(),
            meters: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, DomainError> {
        let config: SessionConfig = serde_yaml::from_str(source)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        config.validated()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DomainError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    /// Clamps ranged values and rejects meter ids the table does not know.
    pub fn validated(mut self) -> Result<Self, DomainError> {
        self.tempo = clamp_tempo(self.tempo);
        self.practice = self.practice.normalized();
        if self.transport.timer_capacity == 0 {
            return Err(DomainError::validation("timer capacity must be positive"));
        }
        if self.transport.resolution_millis == 0 {
            return Err(DomainError::validation("driver resolution must be positive"));
        }
        if self.mode.trim().is_empty() || self.instrument.trim().is_empty() {
            return Err(DomainError::validation(
                "melodic mode and instrument must be set",
            ));
        }
        let table = self.meter_table()?;
        table.meter(&self.meter)?;
        Ok(self)
    }

    pub fn meter_table(&self) -> Result<MeterTable, DomainError> {
        if self.meters.is_empty() {
            Ok(MeterTable::builtin())
        } else {
            MeterTable::from_definitions(self.meters.clone())
        }
    }

    pub fn locator(&self) -> DirectoryLocator {
        DirectoryLocator::new(self.asset_root.clone(), self.asset_extension.clone())
    }
}
