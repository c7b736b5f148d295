//! Nearest-string matching.

use serde::{Deserialize, Serialize};

use crate::config::TunerConfig;
use crate::instrument::{InstrumentStringTable, StringConfig};
use crate::tuning;

/// Which way the raw reading is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Flat,
    Sharp,
    Perfect,
}

impl Direction {
    /// `Perfect` inside `in_tune_cents`, otherwise by sign.
    pub fn from_cents(cents: f64, in_tune_cents: f64) -> Self {
        if cents.abs() <= in_tune_cents {
            Direction::Perfect
        } else if cents < 0.0 {
            Direction::Flat
        } else {
            Direction::Sharp
        }
    }
}

/// Result of matching one frame against the string table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteDetectionResult {
    pub matched_string: StringConfig,
    /// Frequency that was matched, after harmonic correction.
    pub frequency_hz: f64,
    /// Signed offset from the target, unsmoothed.
    pub cents_offset: f64,
    pub direction: Direction,
    pub was_harmonic_corrected: bool,
}

/// Finds the closest string to a frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringMatcher {
    max_match_cents: f64,
    in_tune_cents: f64,
}

impl StringMatcher {
    pub fn new(max_match_cents: f64, in_tune_cents: f64) -> Self {
        Self {
            max_match_cents,
            in_tune_cents,
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(config.max_match_cents, config.in_tune_enter_cents)
    }

    /// Closest string by absolute cents; the earlier entry wins a tie.
    ///
    /// `None` when `freq` is not a positive number or is further than the
    /// maximum match distance from every string.
    pub fn match_closest(
        &self,
        freq: f64,
        table: &InstrumentStringTable,
    ) -> Option<NoteDetectionResult> {
        if !freq.is_finite() || freq <= 0.0 {
            return None;
        }

        let mut best: Option<(&StringConfig, f64)> = None;
        for string in table {
            let cents = tuning::cents_deviation(freq, string.target_frequency_hz);
            match best {
                Some((_, best_cents)) if cents.abs() >= best_cents.abs() => {}
                _ => best = Some((string, cents)),
            }
        }

        let (string, cents) = best?;
        if cents.abs() > self.max_match_cents {
            return None;
        }

        Some(NoteDetectionResult {
            matched_string: *string,
            frequency_hz: freq,
            cents_offset: cents,
            direction: Direction::from_cents(cents, self.in_tune_cents),
            was_harmonic_corrected: false,
        })
    }
}
