pub mod backend;
pub mod dsp;
pub mod io;
pub mod loader;

pub use backend::{Accompaniment, NullAccompaniment, NullPlayer, Player, PlayerState};
pub use dsp::{pitch_ratio, playback_rate};
pub use io::{AudioClip, AudioDecoder};
pub use loader::{AssetLoader, FileLoader, LoadError};
