//! # Frequency Estimation
//!
//! [`FrequencyEstimator`] puts the acceptance rules around a
//! [`PitchDetector`]. A frame produces an estimate only if it:
//! 1. has the configured length and sample rate
//! 2. is louder than the noise gate
//! 3. yields a detector result with clarity at or above the threshold
//! 4. yields a finite frequency inside the supported range
//!
//! Everything else is "no pitch this frame", the normal state of affairs
//! between notes, and is reported as `None` without logging above trace.

use crate::config::TunerConfig;
use crate::error::TunerResult;
use crate::frame::AudioFrame;
use crate::pitch::{self, PitchDetector, PitchEstimate};

/// Pitch detector plus the gates that decide whether its answer is reported.
pub struct FrequencyEstimator {
    detector: Box<dyn PitchDetector>,
    sample_rate: u32,
    window_size: usize,
    min_clarity: f64,
    noise_gate_rms: f64,
    min_frequency_hz: f64,
    max_frequency_hz: f64,
}

impl std::fmt::Debug for FrequencyEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyEstimator")
            .field("sample_rate", &self.sample_rate)
            .field("window_size", &self.window_size)
            .field("min_clarity", &self.min_clarity)
            .field("min_frequency_hz", &self.min_frequency_hz)
            .field("max_frequency_hz", &self.max_frequency_hz)
            .finish_non_exhaustive()
    }
}

impl FrequencyEstimator {
    /// Estimator using the detector selected in `config`.
    pub fn new(config: &TunerConfig) -> TunerResult<Self> {
        config.validate()?;
        Self::with_detector(config, pitch::detector_for(config))
    }

    /// Estimator around a caller-supplied detector.
    pub fn with_detector(config: &TunerConfig, detector: Box<dyn PitchDetector>) -> TunerResult<Self> {
        config.validate()?;
        Ok(Self {
            detector,
            sample_rate: config.sample_rate,
            window_size: config.window_size,
            min_clarity: config.min_clarity,
            noise_gate_rms: config.noise_gate_rms,
            min_frequency_hz: config.min_frequency_hz,
            max_frequency_hz: config.max_frequency_hz,
        })
    }

    /// Estimates the pitch of one frame, or `None` if there is none to report.
    pub fn estimate(&mut self, frame: &AudioFrame) -> Option<PitchEstimate> {
        if frame.len() != self.window_size || frame.sample_rate() != self.sample_rate {
            log::trace!(
                "[ESTIMATOR] ignoring malformed frame ({} samples @ {} Hz)",
                frame.len(),
                frame.sample_rate()
            );
            return None;
        }

        if frame.rms() < self.noise_gate_rms {
            return None;
        }

        let estimate = self.detector.detect(frame.samples(), self.sample_rate)?;

        // The detector's numbers are not trusted blindly.
        if !estimate.clarity.is_finite() || estimate.clarity < self.min_clarity {
            return None;
        }
        if !estimate.frequency.is_finite() || estimate.frequency <= 0.0 {
            log::trace!("[ESTIMATOR] detector returned {} Hz", estimate.frequency);
            return None;
        }
        if estimate.frequency < self.min_frequency_hz || estimate.frequency > self.max_frequency_hz {
            return None;
        }

        Some(estimate)
    }
}
