const NOTE_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Absolute key reached by shifting C by `semitones`.
pub fn key_name(semitones: i32) -> &'static str {
    NOTE_NAMES[semitones.rem_euclid(12) as usize]
}

/// Relative shift label, e.g. `+2`, `-1`, `0`.
pub fn shift_label(semitones: i32) -> String {
    if semitones > 0 {
        format!("+{}", semitones)
    } else {
        semitones.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_wrap_both_ways() {
        assert_eq!(key_name(0), "C");
        assert_eq!(key_name(1), "Db");
        assert_eq!(key_name(11), "B");
        assert_eq!(key_name(12), "C");
        assert_eq!(key_name(-1), "B");
        assert_eq!(key_name(-13), "B");
    }

    #[test]
    fn labels() {
        assert_eq!(shift_label(2), "+2");
        assert_eq!(shift_label(-3), "-3");
        assert_eq!(shift_label(0), "0");
    }
}
