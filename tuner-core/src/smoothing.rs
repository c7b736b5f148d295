//! # Cents Smoothing
//!
//! A scalar Kalman filter over the per-frame cents reading. The state is a
//! single value (the true offset) that is assumed constant between frames
//! apart from process noise `Q`; each reading carries measurement noise `R`.
//!
//! When a reading jumps by more than the rapid-change threshold (a new
//! string, or a big turn of the peg) that one update uses a larger `Q`, so
//! the estimate follows within a frame or two instead of creeping towards
//! the new value.

use serde::{Deserialize, Serialize};

use crate::config::TunerConfig;

/// Filter state. Lives for one tuner session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    pub estimate: f64,
    pub error_covariance: f64,
}

impl KalmanState {
    pub fn new(initial_covariance: f64) -> Self {
        Self {
            estimate: 0.0,
            error_covariance: initial_covariance,
        }
    }
}

/// Filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentsSmoother {
    process_noise: f64,
    rapid_process_noise: f64,
    rapid_change_cents: f64,
    measurement_noise: f64,
    initial_covariance: f64,
}

impl CentsSmoother {
    pub fn from_config(config: &TunerConfig) -> Self {
        Self {
            process_noise: config.process_noise,
            rapid_process_noise: config.rapid_process_noise,
            rapid_change_cents: config.rapid_change_cents,
            measurement_noise: config.measurement_noise,
            initial_covariance: config.initial_covariance,
        }
    }

    /// Fresh state for a new session.
    pub fn initial_state(&self) -> KalmanState {
        KalmanState::new(self.initial_covariance)
    }

    /// Clears the estimate and restores the initial covariance.
    pub fn reset(&self, state: &mut KalmanState) {
        *state = self.initial_state();
    }

    /// Folds one measurement into `state` and returns the new estimate.
    pub fn update(&self, state: &mut KalmanState, measurement: f64) -> f64 {
        let innovation = measurement - state.estimate;
        let q = if innovation.abs() > self.rapid_change_cents {
            self.rapid_process_noise
        } else {
            self.process_noise
        };

        let predicted = state.error_covariance + q;
        let gain = predicted / (predicted + self.measurement_noise);

        state.estimate += gain * innovation;
        state.error_covariance = (1.0 - gain) * predicted;
        state.estimate
    }

    /// Error covariance the filter settles at under steady (base `Q`) updates.
    ///
    /// Fixed point of `P = (P + Q) R / (P + Q + R)`.
    pub fn steady_state_covariance(&self) -> f64 {
        let q = self.process_noise;
        let r = self.measurement_noise;
        (-q + (q * q + 4.0 * q * r).sqrt()) / 2.0
    }

    /// Limiting Kalman gain. Each steady update shrinks the remaining error by
    /// a factor of `1 - gain`.
    pub fn steady_state_gain(&self) -> f64 {
        let predicted = self.steady_state_covariance() + self.process_noise;
        predicted / (predicted + self.measurement_noise)
    }
}
