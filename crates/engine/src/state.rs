use lehra_audio::playback_rate;
use lehra_domain::{band_for, AssetKey, Meter, TempoBand};

/// Everything the coordinator knows about the running session. Mutated only
/// through [`crate::PlaybackCoordinator`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub tempo: f64,
    pub meter: Meter,
    pub mode_id: String,
    pub instrument_id: String,
    /// Band of the recording currently in the player.
    pub active_band: TempoBand,
    /// Native tempo of the recording currently in the player.
    pub active_reference_tempo: f64,
    pub cycle_position: u32,
    pub is_playing: bool,
    pub pitch_shift: i32,
    pub accompaniment_enabled: bool,
    pub accompaniment_volume_db: f32,
}

impl PlaybackState {
    pub fn new(
        meter: Meter,
        mode_id: impl Into<String>,
        instrument_id: impl Into<String>,
        tempo: f64,
    ) -> Self {
        let band = band_for(tempo);
        Self {
            tempo,
            meter,
            mode_id: mode_id.into(),
            instrument_id: instrument_id.into(),
            active_band: band,
            active_reference_tempo: band.reference_tempo(),
            cycle_position: 0,
            is_playing: false,
            pitch_shift: 0,
            accompaniment_enabled: false,
            accompaniment_volume_db: -10.0,
        }
    }

    /// Key of the recording the current selection calls for.
    pub fn desired_key(&self) -> AssetKey {
        AssetKey::new(
            self.meter.id.clone(),
            self.mode_id.clone(),
            self.instrument_id.clone(),
            band_for(self.tempo),
        )
    }

    pub fn playback_rate(&self) -> f64 {
        playback_rate(self.tempo, self.active_reference_tempo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lehra_domain::MeterTable;

    #[test]
    fn defaults_anchor_to_medium_band() {
        let meter = MeterTable::builtin().meter("teental").unwrap().clone();
        let state = PlaybackState::new(meter, "kirwani", "santoor", 100.0);
        assert_eq!(state.active_band, TempoBand::Medium);
        assert_eq!(state.active_reference_tempo, 100.0);
        assert_eq!(state.playback_rate(), 1.0);
        assert_eq!(
            state.desired_key().identifier(),
            "teental_kirwani_madhya_santoor"
        );
    }
}
