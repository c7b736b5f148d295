//! # Fast Fourier Transform (FFT) Module
//!
//! FFT support for the pitch detectors. The McLeod detector needs the linear
//! autocorrelation of each analysis window; computing it through the
//! frequency domain turns an O(N²) sum into two O(N log N) transforms.
//!
//! ## Features
//! - Forward and inverse plans built once per window size with RustFFT
//! - Zero padding to twice the window so the result is linear, not circular
//! - DC offset removal for accurate analysis

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Removes the DC offset from a signal by making its average value zero.
///
/// A constant offset adds the same positive amount to every autocorrelation
/// lag and flattens the peaks the detectors look for.
pub fn remove_dc_offset(signal: &mut [f64]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f64>() / len as f64;
    if avg.abs() > 1e-9 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Computes linear autocorrelation of fixed-size windows.
pub struct Autocorrelator {
    window_size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl std::fmt::Debug for Autocorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autocorrelator")
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

impl Autocorrelator {
    pub fn new(window_size: usize) -> Self {
        let fft_size = (window_size * 2).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            window_size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Writes `r(τ) = Σ x[j]·x[j+τ]` for `τ in 0..output.len()`.
    ///
    /// # Panics
    /// * If `signal` is longer than the window or `output` longer than the signal
    pub fn compute(&mut self, signal: &[f64], output: &mut [f64]) {
        assert!(signal.len() <= self.window_size, "signal longer than window");
        assert!(output.len() <= signal.len(), "more lags requested than samples");

        for (slot, &sample) in self.buffer.iter_mut().zip(signal) {
            *slot = Complex::new(sample, 0.0);
        }
        for slot in self.buffer.iter_mut().skip(signal.len()) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Power spectrum
        for bin in self.buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }

        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // RustFFT leaves the inverse unnormalised.
        let scale = 1.0 / self.buffer.len() as f64;
        for (out, bin) in output.iter_mut().zip(&self.buffer) {
            *out = bin.re * scale;
        }
    }
}
