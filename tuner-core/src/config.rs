//! # Tuner Configuration
//!
//! A single plain struct holds every tunable of the pipeline. It is supplied
//! once when a [`TunerSession`](crate::session::TunerSession) is built and is
//! validated there; nothing in the crate reads configuration from anywhere
//! else.
//!
//! Two presets exist:
//! - [`TunerConfig::guitar`] (also `Default`): 4096-sample window, 60–1500 Hz
//! - [`TunerConfig::bass`]: 8192-sample window, 25–1000 Hz, so a low B
//!   (~31 Hz) still completes several periods per window

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{TunerError, TunerResult};

/// Reference capture rate (CD quality).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of periods of the lowest supported frequency the window must hold.
const MIN_PERIODS_PER_WINDOW: f64 = 2.0;

/// Largest accepted analysis window (about 1.5 s at 44.1 kHz).
pub const MAX_WINDOW_SIZE: usize = 1 << 16;

/// Slowest accepted analysis rate.
const MIN_ANALYSIS_RATE_HZ: f64 = 1.0;

/// Which pitch-detection primitive the estimator wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// McLeod Pitch Method (normalized square difference function).
    #[default]
    McLeod,
    /// YIN (cumulative mean normalized difference).
    Yin,
}

/// Configuration for one tuner session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Expected capture rate in Hz. Frames at any other rate are rejected.
    pub sample_rate: u32,
    /// Analysis window length in samples.
    pub window_size: usize,
    /// Pitch-detection primitive.
    pub detector: DetectorKind,
    /// Minimum clarity (0..1) for an estimate to be accepted.
    pub min_clarity: f64,
    /// RMS level below which a frame is treated as silence.
    pub noise_gate_rms: f64,
    /// Lowest accepted frequency in Hz.
    pub min_frequency_hz: f64,
    /// Highest accepted frequency in Hz.
    pub max_frequency_hz: f64,
    /// Cents tolerance for "already matches a string" in harmonic correction.
    pub string_match_tolerance_cents: f64,
    /// Relative tolerance for the half-frequency check (0.03 = 3%).
    pub harmonic_tolerance_ratio: f64,
    /// Beyond this many cents from every string, nothing is matched.
    pub max_match_cents: f64,
    /// Entering the in-tune band.
    pub in_tune_enter_cents: f64,
    /// Leaving the in-tune band. Wider than the enter band.
    pub in_tune_exit_cents: f64,
    /// Base Kalman process noise `Q`.
    pub process_noise: f64,
    /// Process noise used for a single update after a large jump.
    pub rapid_process_noise: f64,
    /// Jump size (cents, one frame) that selects the rapid process noise.
    pub rapid_change_cents: f64,
    /// Kalman measurement noise `R`.
    pub measurement_noise: f64,
    /// Error covariance after a reset.
    pub initial_covariance: f64,
    /// How long the reading must stay inside the enter band before `InTune`.
    pub min_dwell_ms: u64,
    /// Upper bound on how often the pipeline runs, in frames per second.
    pub analysis_rate_hz: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self::guitar()
    }
}

impl TunerConfig {
    /// Guitar-oriented profile.
    pub fn guitar() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            // ~93ms at 44.1kHz, low E completes ~7.7 cycles
            window_size: 4096,
            detector: DetectorKind::McLeod,
            min_clarity: 0.85,
            noise_gate_rms: 0.01,
            min_frequency_hz: 60.0,
            max_frequency_hz: 1500.0,
            string_match_tolerance_cents: 50.0,
            harmonic_tolerance_ratio: 0.03,
            max_match_cents: 400.0,
            in_tune_enter_cents: 5.0,
            in_tune_exit_cents: 8.0,
            process_noise: 0.1,
            rapid_process_noise: 0.5,
            rapid_change_cents: 20.0,
            measurement_noise: 0.5,
            initial_covariance: 1.0,
            min_dwell_ms: 100,
            analysis_rate_hz: 30.0,
        }
    }

    /// Bass-oriented profile: wider low bound, longer window.
    pub fn bass() -> Self {
        Self {
            window_size: 8192,
            min_frequency_hz: 25.0,
            max_frequency_hz: 1000.0,
            ..Self::guitar()
        }
    }

    /// Minimum dwell as a `Duration`.
    pub fn min_dwell(&self) -> Duration {
        Duration::from_millis(self.min_dwell_ms)
    }

    /// Minimum spacing between analysed frames.
    pub fn analysis_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.analysis_rate_hz)
    }

    /// Number of new samples between two analysis windows at the configured
    /// analysis rate.
    pub fn hop_size(&self) -> usize {
        ((self.sample_rate as f64 / self.analysis_rate_hz).round() as usize).max(1)
    }

    /// Parses a JSON configuration. Missing fields take their guitar defaults.
    pub fn from_json_str(json: &str) -> TunerResult<Self> {
        let config: TunerConfig =
            serde_json::from_str(json).map_err(|e| TunerError::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> TunerResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| TunerError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    /// Checks every field. Called by all constructors that accept a config.
    pub fn validate(&self) -> TunerResult<()> {
        if self.sample_rate == 0 {
            return Err(TunerError::InvalidSampleRate(self.sample_rate));
        }

        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.min_frequency_hz.is_finite() && self.max_frequency_hz.is_finite())
            || self.min_frequency_hz <= 0.0
            || self.min_frequency_hz >= self.max_frequency_hz
            || self.max_frequency_hz >= nyquist
        {
            return Err(TunerError::InvalidFrequencyRange {
                min: self.min_frequency_hz,
                max: self.max_frequency_hz,
                sample_rate: self.sample_rate,
            });
        }

        let required =
            (MIN_PERIODS_PER_WINDOW * self.sample_rate as f64 / self.min_frequency_hz).ceil() as usize;
        if self.window_size < required {
            return Err(TunerError::WindowTooShort {
                window: self.window_size,
                min_frequency: self.min_frequency_hz,
                required,
            });
        }

        if self.window_size > MAX_WINDOW_SIZE {
            return Err(TunerError::WindowTooLong {
                window: self.window_size,
                max: MAX_WINDOW_SIZE,
            });
        }

        for (name, value) in [
            ("min_clarity", self.min_clarity),
            ("noise_gate_rms", self.noise_gate_rms),
            ("harmonic_tolerance_ratio", self.harmonic_tolerance_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TunerError::ThresholdOutOfRange { name, value });
            }
        }

        for (name, value) in [
            ("string_match_tolerance_cents", self.string_match_tolerance_cents),
            ("max_match_cents", self.max_match_cents),
            ("in_tune_enter_cents", self.in_tune_enter_cents),
            ("in_tune_exit_cents", self.in_tune_exit_cents),
            ("rapid_change_cents", self.rapid_change_cents),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TunerError::InvalidCentsThreshold { name, value });
            }
        }

        if self.in_tune_exit_cents < self.in_tune_enter_cents {
            return Err(TunerError::InvertedHysteresis {
                enter: self.in_tune_enter_cents,
                exit: self.in_tune_exit_cents,
            });
        }

        for (name, value) in [
            ("process_noise", self.process_noise),
            ("rapid_process_noise", self.rapid_process_noise),
            ("measurement_noise", self.measurement_noise),
            ("initial_covariance", self.initial_covariance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TunerError::InvalidNoise { name, value });
            }
        }

        if !(MIN_ANALYSIS_RATE_HZ..=self.sample_rate as f64).contains(&self.analysis_rate_hz) {
            return Err(TunerError::InvalidAnalysisRate(self.analysis_rate_hz));
        }

        Ok(())
    }
}
