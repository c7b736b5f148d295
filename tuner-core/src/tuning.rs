//! # Musical Tuning Module
//!
//! Equal temperament arithmetic shared by the instrument tables, the
//! harmonic corrector and the string matcher.
//!
//! ## Features
//! - Twelve pitch classes with sharp spellings
//! - Equal temperament frequency of any note relative to a reference A4
//! - Cent deviation and its inverse

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Concert pitch.
pub const A4_HZ: f64 = 440.0;

const A4_MIDI: i32 = 69;

/// Twelve chromatic pitch classes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl NoteName {
    /// All pitch classes starting from C.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::Cs,
        NoteName::D,
        NoteName::Ds,
        NoteName::E,
        NoteName::F,
        NoteName::Fs,
        NoteName::G,
        NoteName::Gs,
        NoteName::A,
        NoteName::As,
        NoteName::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        self as i32
    }

    pub fn from_semitone(semitone: i32) -> Self {
        Self::ALL[semitone.rem_euclid(12) as usize]
    }
}

impl Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteName::C => "C",
            NoteName::Cs => "C#",
            NoteName::D => "D",
            NoteName::Ds => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Fs => "F#",
            NoteName::G => "G",
            NoteName::Gs => "G#",
            NoteName::A => "A",
            NoteName::As => "A#",
            NoteName::B => "B",
        };
        f.write_str(name)
    }
}

/// MIDI note number, with C4 = 60.
pub fn midi_number(note: NoteName, octave: i8) -> i32 {
    (octave as i32 + 1) * 12 + note.semitone()
}

/// Equal temperament frequency of `note` in `octave`, given the frequency of A4.
///
/// The formula is f = f0 * 2^(n/12), where n is the number of semitones
/// away from A4.
pub fn equal_tempered_frequency(note: NoteName, octave: i8, a4_hz: f64) -> f64 {
    let semitones = (midi_number(note, octave) - A4_MIDI) as f64;
    a4_hz * 2f64.powf(semitones / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

/// Frequency lying `cents` away from `target_freq`. Inverse of [`cents_deviation`].
pub fn frequency_at_cents(target_freq: f64, cents: f64) -> f64 {
    target_freq * 2f64.powf(cents / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_pitches() {
        assert!((equal_tempered_frequency(NoteName::A, 4, A4_HZ) - 440.0).abs() < 1e-9);
        assert!((equal_tempered_frequency(NoteName::E, 2, A4_HZ) - 82.4069).abs() < 1e-4);
        assert!((equal_tempered_frequency(NoteName::B, 0, A4_HZ) - 30.8677).abs() < 1e-4);
        assert!((equal_tempered_frequency(NoteName::A, 2, 432.0) - 108.0).abs() < 1e-9);
    }

    #[test]
    fn octave_is_twelve_hundred_cents() {
        assert!((cents_deviation(220.0, 110.0) - 1200.0).abs() < 1e-9);
        assert!((cents_deviation(110.0, 220.0) + 1200.0).abs() < 1e-9);
        assert!((cents_deviation(110.5, 110.0) - 7.85).abs() < 0.01);
    }

    #[test]
    fn note_names_round_trip_through_semitones() {
        for note in NoteName::ALL {
            assert_eq!(NoteName::from_semitone(note.semitone()), note);
        }
        assert_eq!(NoteName::from_semitone(-1), NoteName::B);
        assert_eq!(NoteName::Fs.to_string(), "F#");
        assert_eq!(midi_number(NoteName::C, 4), 60);
    }

    proptest! {
        #[test]
        fn cents_round_trip(freq in 20.0f64..5000.0, target in 20.0f64..5000.0) {
            let cents = cents_deviation(freq, target);
            let back = frequency_at_cents(target, cents);
            prop_assert!((back - freq).abs() <= freq * 1e-12);
        }
    }
}
