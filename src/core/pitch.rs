//! Pitch primitives shared by the catalog, generator, and session.
//!
//! Pitches are MIDI note numbers. Intervals are pitch classes measured
//! upward from whichever key center was sounding.

/// An absolute pitch as a MIDI note number (60 = middle C).
pub type Pitch = u8;

/// Number of pitch classes in an octave.
pub const PITCH_CLASSES: usize = 12;

/// The tonic reference pitch every non-modulated question is keyed on.
pub const TONIC: Pitch = 60;

/// Lowest key center a modulated question can use.
///
/// Modulated keys are drawn from the 12 semitones starting here, which
/// straddles the tonic's octave.
pub const KEY_BAND_LOW: Pitch = TONIC - 6;

/// Interval (pitch class) of `pitch` relative to `key_center`, in 0..12.
pub fn interval_of(pitch: Pitch, key_center: Pitch) -> usize {
    (i16::from(pitch) - i16::from(key_center)).rem_euclid(PITCH_CLASSES as i16) as usize
}

/// Scale-degree label of an interval, e.g. `b3` or `5`.
pub fn interval_name(interval: usize) -> &'static str {
    const NAMES: [&str; PITCH_CLASSES] = [
        "1", "b2", "2", "b3", "3", "4", "#4", "5", "b6", "6", "b7", "7",
    ];
    NAMES[interval % PITCH_CLASSES]
}

/// Display name of a pitch, e.g. `C4` or `F#3`.
pub fn pitch_name(pitch: Pitch) -> String {
    const NAMES: [&str; PITCH_CLASSES] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = i16::from(pitch) / 12 - 1;
    format!("{}{}", NAMES[usize::from(pitch) % PITCH_CLASSES], octave)
}

/// Parse a pitch from a MIDI number (`64`) or a note name (`E4`, `Bb3`).
pub fn parse_pitch(input: &str) -> Option<Pitch> {
    let trimmed = input.trim();
    if let Ok(number) = trimmed.parse::<u8>() {
        return (number <= 127).then_some(number);
    }

    let mut chars = trimmed.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i16 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest: String = chars.collect();
    let (accidental, octave) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest.as_str()),
    };
    let octave: i16 = octave.parse().ok()?;
    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_of_above_and_below_key() {
        assert_eq!(interval_of(60, 60), 0);
        assert_eq!(interval_of(67, 60), 7);
        assert_eq!(interval_of(72, 60), 0);
        assert_eq!(interval_of(59, 60), 11);
        assert_eq!(interval_of(48, 60), 0);
    }

    #[test]
    fn test_interval_name() {
        assert_eq!(interval_name(0), "1");
        assert_eq!(interval_name(3), "b3");
        assert_eq!(interval_name(7), "5");
        assert_eq!(interval_name(11), "7");
    }

    #[test]
    fn test_pitch_name() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(61), "C#4");
        assert_eq!(pitch_name(59), "B3");
    }

    #[test]
    fn test_parse_pitch() {
        assert_eq!(parse_pitch("64"), Some(64));
        assert_eq!(parse_pitch("C4"), Some(60));
        assert_eq!(parse_pitch("f#4"), Some(66));
        assert_eq!(parse_pitch("Bb3"), Some(58));
        assert_eq!(parse_pitch("H2"), None);
        assert_eq!(parse_pitch(""), None);
        assert_eq!(parse_pitch("200"), None);
    }
}
