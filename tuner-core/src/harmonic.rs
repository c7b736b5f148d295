//! Second-harmonic correction.
//!
//! Plucked strings often put more energy into the octave than into the
//! fundamental, and the detector then reports a frequency one octave too
//! high. If a reading does not match any string but half of it does, the
//! half is used instead. Only the 2nd harmonic is considered: the 3rd and
//! 4th can land on genuinely different strings of the same instrument.

use crate::config::TunerConfig;
use crate::instrument::InstrumentStringTable;
use crate::tuning;

/// Halves frequencies that look like a 2nd-harmonic lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicCorrector {
    /// Cents window for "already on a string".
    match_tolerance_cents: f64,
    /// Relative window for the half-frequency check.
    harmonic_tolerance_ratio: f64,
}

impl HarmonicCorrector {
    pub fn new(match_tolerance_cents: f64, harmonic_tolerance_ratio: f64) -> Self {
        Self {
            match_tolerance_cents,
            harmonic_tolerance_ratio,
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(
            config.string_match_tolerance_cents,
            config.harmonic_tolerance_ratio,
        )
    }

    /// Returns the frequency to match and whether it was halved.
    pub fn correct(&self, freq: f64, table: &InstrumentStringTable) -> (f64, bool) {
        if !freq.is_finite() || freq <= 0.0 {
            return (freq, false);
        }

        let on_a_string = table.iter().any(|string| {
            tuning::cents_deviation(freq, string.target_frequency_hz).abs()
                <= self.match_tolerance_cents
        });
        if on_a_string {
            return (freq, false);
        }

        // Plain ratio test: cheaper than cents and close enough at 3%.
        let half = freq / 2.0;
        let half_on_a_string = table.iter().any(|string| {
            (half / string.target_frequency_hz - 1.0).abs() <= self.harmonic_tolerance_ratio
        });
        if half_on_a_string {
            log::trace!("[HARMONIC] {freq:.2} Hz treated as 2nd harmonic of {half:.2} Hz");
            return (half, true);
        }

        (freq, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use proptest::prelude::*;

    fn corrector() -> HarmonicCorrector {
        HarmonicCorrector::from_config(&TunerConfig::default())
    }

    #[test]
    fn direct_match_is_left_alone() {
        let table = Instrument::GuitarStandard.table();
        assert_eq!(corrector().correct(110.0, table), (110.0, false));
        // 40 cents sharp of A2 is still "on" A2.
        let sharp = tuning::frequency_at_cents(110.0, 40.0);
        assert_eq!(corrector().correct(sharp, table), (sharp, false));
    }

    #[test]
    fn octave_of_low_e_is_halved() {
        let table = Instrument::GuitarStandard.table();
        let (freq, corrected) = corrector().correct(164.82, table);
        assert!(corrected);
        assert!((freq - 82.41).abs() < 1e-9);
    }

    #[test]
    fn unrecognised_frequency_passes_through() {
        let table = Instrument::GuitarStandard.table();
        // 600 Hz and its half (300 Hz) both sit far from every string.
        assert_eq!(corrector().correct(600.0, table), (600.0, false));
    }

    #[test]
    fn third_harmonic_is_not_corrected() {
        // 3 x A2 = 330 Hz lands on E4 and must stay there.
        let table = Instrument::GuitarStandard.table();
        assert_eq!(corrector().correct(330.0, table), (330.0, false));
        // 3 x E2 = 247.2 Hz sits on B3.
        assert_eq!(corrector().correct(247.2, table), (247.2, false));
    }

    #[test]
    fn ratio_tolerance_is_relative() {
        let table = Instrument::GuitarStandard.table();
        // Half is 2.9% above A2: inside 3%, and the full value matches nothing.
        let freq = 2.0 * 110.0 * 1.029;
        let (half, corrected) = corrector().correct(freq, table);
        assert!(corrected);
        assert!((half - (110.0 * 1.029)).abs() < 1e-9);
        // 3.1% is out.
        let freq = 2.0 * 110.0 * 1.031;
        assert_eq!(corrector().correct(freq, table), (freq, false));
    }

    #[test]
    fn invalid_input_is_passed_through() {
        let table = Instrument::GuitarStandard.table();
        let (freq, corrected) = corrector().correct(f64::NAN, table);
        assert!(freq.is_nan());
        assert!(!corrected);
        assert_eq!(corrector().correct(-5.0, table), (-5.0, false));
    }

    proptest! {
        #[test]
        fn correction_is_idempotent(freq in 20.0f64..2000.0, table_index in 0usize..4) {
            let instrument = [
                Instrument::GuitarStandard,
                Instrument::Bass4,
                Instrument::Bass5,
                Instrument::Chromatic,
            ][table_index];
            let table = instrument.table();
            let once = corrector().correct(freq, table).0;
            let twice = corrector().correct(once, table).0;
            prop_assert_eq!(once, twice);
        }
    }
}
