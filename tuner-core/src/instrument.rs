//! # Instrument String Tables
//!
//! An [`InstrumentStringTable`] is the ordered list of target notes the
//! tuner can lock onto. Tables are validated once on construction (non-empty,
//! positive targets, no two targets within [`DUPLICATE_TOLERANCE_CENTS`]) and
//! never change afterwards.
//!
//! The built-in tables are computed from equal temperament with A4 = 440 Hz
//! and cached in statics. [`InstrumentStringTable::for_instrument`] builds a
//! table against any other reference pitch.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::config::TunerConfig;
use crate::error::{TunerError, TunerResult};
use crate::tuning::{self, A4_HZ, NoteName};

/// Two targets closer than this are considered the same string.
pub const DUPLICATE_TOLERANCE_CENTS: f64 = 50.0;

/// One string (or chromatic note) the tuner can match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringConfig {
    /// Position in the table, starting at 1
    pub ordinal: u8,
    pub note: NoteName,
    pub octave: i8,
    pub target_frequency_hz: f64,
}

impl StringConfig {
    /// Note and octave as e.g. "E2".
    pub fn label(&self) -> String {
        format!("{}{}", self.note, self.octave)
    }
}

/// Ordered, immutable list of target strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentStringTable {
    name: String,
    strings: Vec<StringConfig>,
}

impl InstrumentStringTable {
    /// Validates and wraps a list of strings.
    pub fn new(name: impl Into<String>, strings: Vec<StringConfig>) -> TunerResult<Self> {
        if strings.is_empty() {
            return Err(TunerError::EmptyTable);
        }

        for string in &strings {
            let f = string.target_frequency_hz;
            if !f.is_finite() || f <= 0.0 {
                return Err(TunerError::InvalidTarget {
                    ordinal: string.ordinal,
                    frequency: f,
                });
            }
        }

        for (i, first) in strings.iter().enumerate() {
            for second in &strings[i + 1..] {
                let cents =
                    tuning::cents_deviation(second.target_frequency_hz, first.target_frequency_hz).abs();
                if cents < DUPLICATE_TOLERANCE_CENTS {
                    return Err(TunerError::DuplicateString {
                        first: first.ordinal,
                        second: second.ordinal,
                        cents,
                    });
                }
            }
        }

        Ok(Self {
            name: name.into(),
            strings,
        })
    }

    /// Builds a table from `(note, octave)` pairs in equal temperament.
    pub fn from_notes(
        name: impl Into<String>,
        notes: &[(NoteName, i8)],
        a4_hz: f64,
    ) -> TunerResult<Self> {
        let strings = notes
            .iter()
            .enumerate()
            .map(|(i, &(note, octave))| StringConfig {
                ordinal: (i + 1) as u8,
                note,
                octave,
                target_frequency_hz: tuning::equal_tempered_frequency(note, octave, a4_hz),
            })
            .collect();
        Self::new(name, strings)
    }

    /// Table for `instrument` tuned against a custom A4.
    pub fn for_instrument(instrument: Instrument, a4_hz: f64) -> TunerResult<Self> {
        match instrument {
            Instrument::Chromatic => Self::from_notes(instrument.to_string(), &piano_keys(), a4_hz),
            _ => Self::from_notes(instrument.to_string(), instrument.open_strings(), a4_hz),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strings(&self) -> &[StringConfig] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StringConfig> {
        self.strings.iter()
    }
}

impl<'a> IntoIterator for &'a InstrumentStringTable {
    type Item = &'a StringConfig;
    type IntoIter = std::slice::Iter<'a, StringConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.strings.iter()
    }
}

/// Instruments with a built-in table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    /// Six-string guitar, E2 A2 D3 G3 B3 E4
    GuitarStandard,
    /// Four-string bass, E1 A1 D2 G2
    Bass4,
    /// Five-string bass, B0 E1 A1 D2 G2
    Bass5,
    /// Every key of an 88-key piano, A0 to C8
    Chromatic,
}

impl Instrument {
    fn open_strings(self) -> &'static [(NoteName, i8)] {
        use NoteName::*;
        match self {
            Instrument::GuitarStandard => &[(E, 2), (A, 2), (D, 3), (G, 3), (B, 3), (E, 4)],
            Instrument::Bass4 => &[(E, 1), (A, 1), (D, 2), (G, 2)],
            Instrument::Bass5 => &[(B, 0), (E, 1), (A, 1), (D, 2), (G, 2)],
            Instrument::Chromatic => &[],
        }
    }

    /// The cached table at concert pitch.
    pub fn table(self) -> &'static InstrumentStringTable {
        match self {
            Instrument::GuitarStandard => &GUITAR_STANDARD,
            Instrument::Bass4 => &BASS_4,
            Instrument::Bass5 => &BASS_5,
            Instrument::Chromatic => &CHROMATIC,
        }
    }

    /// Estimator profile suited to the instrument's range.
    pub fn recommended_config(self) -> TunerConfig {
        match self {
            Instrument::Bass4 | Instrument::Bass5 => TunerConfig::bass(),
            Instrument::GuitarStandard | Instrument::Chromatic => TunerConfig::guitar(),
        }
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Instrument::GuitarStandard => "guitar",
            Instrument::Bass4 => "bass4",
            Instrument::Bass5 => "bass5",
            Instrument::Chromatic => "chromatic",
        };
        f.write_str(name)
    }
}

impl FromStr for Instrument {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guitar" | "guitar-standard" => Ok(Instrument::GuitarStandard),
            "bass" | "bass4" => Ok(Instrument::Bass4),
            "bass5" => Ok(Instrument::Bass5),
            "chromatic" => Ok(Instrument::Chromatic),
            other => Err(TunerError::UnknownInstrument(other.to_string())),
        }
    }
}

/// The 88 keys of a standard piano, A0 to C8.
fn piano_keys() -> Vec<(NoteName, i8)> {
    // MIDI 21 is A0, MIDI 108 is C8.
    (21..=108)
        .map(|midi: i32| (NoteName::from_semitone(midi), (midi / 12 - 1) as i8))
        .collect()
}

fn builtin(instrument: Instrument) -> InstrumentStringTable {
    InstrumentStringTable::for_instrument(instrument, A4_HZ)
        .unwrap_or_else(|e| unreachable!("built-in {instrument} table is invalid: {e}"))
}

static GUITAR_STANDARD: Lazy<InstrumentStringTable> =
    Lazy::new(|| builtin(Instrument::GuitarStandard));
static BASS_4: Lazy<InstrumentStringTable> = Lazy::new(|| builtin(Instrument::Bass4));
static BASS_5: Lazy<InstrumentStringTable> = Lazy::new(|| builtin(Instrument::Bass5));
static CHROMATIC: Lazy<InstrumentStringTable> = Lazy::new(|| builtin(Instrument::Chromatic));
