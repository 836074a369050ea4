pub mod asset;
pub mod config;
pub mod error;
pub mod events;
pub mod meter;
pub mod pitch;
pub mod practice;
pub mod tempo;

pub use crate::asset::{AssetKey, AssetLocator, DirectoryLocator};
pub use crate::config::{AccompanimentSettings, SessionConfig, TransportSettings};
pub use crate::error::DomainError;
pub use crate::events::{AssetStatus, PracticeStatus, VisualEvent};
pub use crate::meter::{BeatMark, Meter, MeterTable};
pub use crate::practice::PracticeSettings;
pub use crate::tempo::{band_for, clamp_tempo, reference_tempo, TempoBand};
