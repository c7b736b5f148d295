//! # Pitch Detection Module
//!
//! Monophonic fundamental-frequency detectors. Each one turns a window of
//! samples into a frequency and a clarity (the detector's own confidence
//! that the window is periodic). They report whatever they find; rejecting
//! unclear or out-of-range results is the job of
//! [`FrequencyEstimator`](crate::estimator::FrequencyEstimator).
//!
//! ## Detectors
//! - [`McLeodDetector`]: McLeod Pitch Method. The normalized square
//!   difference function (NSDF) is built from an FFT autocorrelation, the
//!   first "key maximum" within 90% of the highest one is taken as the
//!   period. Default.
//! - [`YinDetector`]: YIN with octave error prevention (first significant
//!   dip rather than global minimum).
//!
//! Both refine the period with parabolic interpolation.

use serde::{Deserialize, Serialize};

use crate::config::{DetectorKind, TunerConfig};
use crate::fft::{Autocorrelator, remove_dc_offset};

/// Fraction of the highest NSDF key maximum a peak must reach to be chosen.
const MCLEOD_PEAK_THRESHOLD: f64 = 0.9;

/// Margin above the global minimum that counts as a YIN dip.
const YIN_DIP_MARGIN: f64 = 0.05;

/// A detected pitch for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Frequency in Hz
    pub frequency: f64,
    /// Detector confidence, 0..1
    pub clarity: f64,
}

/// A monophonic pitch-detection primitive.
pub trait PitchDetector: Send {
    /// Analyses one window. `None` when no periodicity was found at all.
    fn detect(&mut self, signal: &[f32], sample_rate: u32) -> Option<PitchEstimate>;
}

/// Builds the detector selected in the configuration.
pub fn detector_for(config: &TunerConfig) -> Box<dyn PitchDetector> {
    // A couple of lags beyond the longest period keep the dip/peak bracketed.
    let longest_period = (config.sample_rate as f64 / config.min_frequency_hz).ceil() as usize + 2;
    match config.detector {
        DetectorKind::McLeod => Box::new(McLeodDetector::new(config.window_size)),
        DetectorKind::Yin => Box::new(YinDetector::new(config.window_size, longest_period)),
    }
}

/// Fits a parabola through three neighbouring points and returns the offset
/// of its vertex from the middle point along with the vertex value.
fn parabolic_vertex(y1: f64, y2: f64, y3: f64) -> (f64, f64) {
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() < 1e-12 {
        return (0.0, y2);
    }
    let shift = (y1 - y3) / (2.0 * denominator);
    (shift, y2 - 0.25 * (y1 - y3) * shift)
}

/// McLeod Pitch Method detector.
#[derive(Debug)]
pub struct McLeodDetector {
    autocorrelator: Autocorrelator,
    signal: Vec<f64>,
    nsdf: Vec<f64>,
    key_maxima: Vec<usize>,
}

impl McLeodDetector {
    pub fn new(window_size: usize) -> Self {
        Self {
            autocorrelator: Autocorrelator::new(window_size),
            signal: vec![0.0; window_size],
            nsdf: vec![0.0; window_size / 2],
            key_maxima: Vec::new(),
        }
    }

    fn compute_nsdf(&mut self) {
        let n = self.signal.len();
        self.autocorrelator.compute(&self.signal, &mut self.nsdf);

        // m(τ) = Σ x[j]² + x[j+τ]², updated incrementally.
        let mut m = 2.0 * self.signal.iter().map(|x| x * x).sum::<f64>();
        for tau in 0..self.nsdf.len() {
            if tau > 0 {
                let head = self.signal[tau - 1];
                let tail = self.signal[n - tau];
                m -= head * head + tail * tail;
            }
            self.nsdf[tau] = if m > 1e-12 { 2.0 * self.nsdf[tau] / m } else { 0.0 };
        }
    }

    /// Collects the highest point of every positive lobe after the first
    /// zero crossing.
    fn collect_key_maxima(&mut self) {
        self.key_maxima.clear();
        let len = self.nsdf.len();
        if len < 3 {
            return;
        }

        let mut pos = 0;
        while pos < len - 1 && self.nsdf[pos] > 0.0 {
            pos += 1;
        }

        while pos < len - 1 {
            while pos < len - 1 && self.nsdf[pos] <= 0.0 {
                pos += 1;
            }
            if pos >= len - 1 {
                break;
            }
            let mut best = pos;
            while pos < len - 1 && self.nsdf[pos] > 0.0 {
                if self.nsdf[pos] > self.nsdf[best] {
                    best = pos;
                }
                pos += 1;
            }
            self.key_maxima.push(best);
        }
    }
}

impl PitchDetector for McLeodDetector {
    fn detect(&mut self, signal: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
        if signal.len() != self.signal.len() || sample_rate == 0 {
            return None;
        }
        for (dst, &src) in self.signal.iter_mut().zip(signal) {
            *dst = src as f64;
        }
        remove_dc_offset(&mut self.signal);

        self.compute_nsdf();
        self.collect_key_maxima();

        let highest = self
            .key_maxima
            .iter()
            .map(|&tau| self.nsdf[tau])
            .fold(f64::NEG_INFINITY, f64::max);
        if !highest.is_finite() || highest <= 0.0 {
            return None;
        }

        let threshold = MCLEOD_PEAK_THRESHOLD * highest;
        let tau = *self
            .key_maxima
            .iter()
            .find(|&&tau| self.nsdf[tau] >= threshold)?;

        let (shift, peak) =
            parabolic_vertex(self.nsdf[tau - 1], self.nsdf[tau], self.nsdf[tau + 1]);
        let period = tau as f64 + shift;
        if period <= 0.0 {
            return None;
        }

        Some(PitchEstimate {
            frequency: sample_rate as f64 / period,
            clarity: peak.clamp(0.0, 1.0),
        })
    }
}

/// YIN detector.
#[derive(Debug)]
pub struct YinDetector {
    window_size: usize,
    max_lag: usize,
    yin_buffer: Vec<f64>,
}

impl YinDetector {
    pub fn new(window_size: usize, max_lag: usize) -> Self {
        let max_lag = max_lag.min(window_size / 2).max(3);
        Self {
            window_size,
            max_lag,
            yin_buffer: vec![0.0; max_lag],
        }
    }
}

impl PitchDetector for YinDetector {
    fn detect(&mut self, signal: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
        if signal.len() != self.window_size || sample_rate == 0 {
            return None;
        }
        let half = self.window_size / 2;
        let lags = self.max_lag;

        // --- Difference function ---
        self.yin_buffer[0] = 0.0;
        for tau in 1..lags {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = (signal[i] - signal[i + tau]) as f64;
                diff += delta * delta;
            }
            self.yin_buffer[tau] = diff;
        }

        // --- Cumulative mean normalized difference ---
        let mut running_sum = 0.0;
        self.yin_buffer[0] = 1.0;
        for tau in 1..lags {
            running_sum += self.yin_buffer[tau];
            self.yin_buffer[tau] = if running_sum > 0.0 {
                self.yin_buffer[tau] * tau as f64 / running_sum
            } else {
                1.0
            };
        }

        // --- First significant dip, to avoid octave errors ---
        let min_val = self
            .yin_buffer
            .iter()
            .skip(1)
            .copied()
            .fold(f64::INFINITY, f64::min);
        let threshold = min_val + YIN_DIP_MARGIN;

        let mut tau = (2..lags - 1).find(|&tau| {
            self.yin_buffer[tau] < threshold && self.yin_buffer[tau] < self.yin_buffer[tau - 1]
        })?;
        while tau + 2 < lags && self.yin_buffer[tau + 1] < self.yin_buffer[tau] {
            tau += 1;
        }

        let (shift, dip) = parabolic_vertex(
            self.yin_buffer[tau - 1],
            self.yin_buffer[tau],
            self.yin_buffer[tau + 1],
        );
        let period = tau as f64 + shift;
        if period <= 0.0 {
            return None;
        }

        Some(PitchEstimate {
            frequency: sample_rate as f64 / period,
            clarity: (1.0 - dip).clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    fn sine(freq: f64, amplitude: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / SAMPLE_RATE as f64;
                (amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect()
    }

    #[test]
    fn mcleod_finds_sine_frequency() {
        let mut detector = McLeodDetector::new(4096);
        for freq in [82.41, 110.0, 196.0, 329.63, 880.0, 1400.0] {
            let pitch = detector
                .detect(&sine(freq, 0.5, 4096), SAMPLE_RATE)
                .expect("pure tone");
            assert!((pitch.frequency - freq).abs() < 1.0);
            assert!(pitch.clarity > 0.9, "clarity {} at {freq}", pitch.clarity);
        }
    }

    #[test]
    fn mcleod_prefers_fundamental_over_strong_second_harmonic() {
        let fundamental = sine(110.0, 0.3, 4096);
        let harmonic = sine(220.0, 0.5, 4096);
        let mixed: Vec<f32> = fundamental.iter().zip(&harmonic).map(|(a, b)| a + b).collect();

        let pitch = McLeodDetector::new(4096)
            .detect(&mixed, SAMPLE_RATE)
            .expect("periodic");
        assert!((pitch.frequency - 110.0).abs() < 1.0);
    }

    #[test]
    fn mcleod_reports_nothing_for_silence() {
        let mut detector = McLeodDetector::new(4096);
        assert!(detector.detect(&[0.0; 4096], SAMPLE_RATE).is_none());
    }

    #[test]
    fn mcleod_rejects_wrong_length() {
        let mut detector = McLeodDetector::new(4096);
        assert!(detector.detect(&sine(110.0, 0.5, 1024), SAMPLE_RATE).is_none());
    }

    #[test]
    fn yin_finds_sine_frequency() {
        let mut detector = YinDetector::new(4096, 740);
        for freq in [82.41, 146.83, 246.94] {
            let pitch = detector
                .detect(&sine(freq, 0.5, 4096), SAMPLE_RATE)
                .expect("pure tone");
            assert!((pitch.frequency - freq).abs() < 1.0);
            assert!(pitch.clarity > 0.85, "clarity {} at {freq}", pitch.clarity);
        }
    }

    #[test]
    fn parabola_vertex_is_exact_for_quadratics() {
        // y = -(x - 0.25)^2 sampled at -1, 0, 1
        let f = |x: f64| -(x - 0.25) * (x - 0.25);
        let (shift, value) = parabolic_vertex(f(-1.0), f(0.0), f(1.0));
        assert!((shift - 0.25).abs() < 1e-12);
        assert!(value.abs() < 1e-12);
    }

    #[test]
    fn factory_follows_config() {
        let config = TunerConfig {
            detector: DetectorKind::Yin,
            ..TunerConfig::default()
        };
        let mut detector = detector_for(&config);
        let pitch = detector
            .detect(&sine(110.0, 0.5, 4096), SAMPLE_RATE)
            .expect("pure tone");
        assert!((pitch.frequency - 110.0).abs() < 1.0);
    }
}
