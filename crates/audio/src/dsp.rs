/// Speed at which a recording made at `reference_bpm` must play to sound at `bpm`.
pub fn playback_rate(bpm: f64, reference_bpm: f64) -> f64 {
    if reference_bpm <= 0.0 {
        return 1.0;
    }
    bpm / reference_bpm
}

/// Frequency ratio of a shift by `semitones` in equal temperament.
pub fn pitch_ratio(semitones: i32) -> f64 {
    2f64.powf(f64::from(semitones) / 12.0)
}

pub fn semitones_to_cents(semitones: i32) -> i32 {
    semitones * 100
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
