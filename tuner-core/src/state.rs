//! # Tuning State Machine
//!
//! Turns the smoothed cents of each frame into a discrete status that is safe
//! to drive a UI or haptics from:
//!
//! - `Idle`: nothing matched this frame
//! - `Tracking`: a string is matched but the reading is not (yet) stably in tune
//! - `InTune`: the reading entered the enter band and stayed there for the
//!   minimum dwell
//!
//! Once `InTune`, the status only drops back when the reading leaves the
//! wider exit band. The gap between the two bands is what keeps the status
//! from flickering when the reading hovers at the edge.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TunerConfig;

/// Point in time on the session clock.
pub type Timestamp = Duration;

/// Discrete tuning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TuningStatus {
    #[default]
    Idle,
    Tracking,
    InTune,
}

/// State carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningState {
    pub status: TuningStatus,
    pub smoothed_cents: f64,
    /// When the reading last entered the enter band, if it is still inside.
    pub dwell_start: Option<Timestamp>,
}

/// Hysteresis and dwell logic.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningStateMachine {
    enter_cents: f64,
    exit_cents: f64,
    min_dwell: Duration,
    state: TuningState,
}

impl TuningStateMachine {
    pub fn new(enter_cents: f64, exit_cents: f64, min_dwell: Duration) -> Self {
        Self {
            enter_cents,
            exit_cents,
            min_dwell,
            state: TuningState::default(),
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(
            config.in_tune_enter_cents,
            config.in_tune_exit_cents,
            config.min_dwell(),
        )
    }

    pub fn state(&self) -> &TuningState {
        &self.state
    }

    pub fn status(&self) -> TuningStatus {
        self.state.status
    }

    /// Back to `Idle` with no dwell in progress.
    pub fn reset(&mut self) {
        self.state = TuningState::default();
    }

    /// Advances one frame. `smoothed_cents` is `None` when nothing matched.
    pub fn update(&mut self, smoothed_cents: Option<f64>, now: Timestamp) -> TuningStatus {
        let previous = self.state.status;

        let Some(cents) = smoothed_cents else {
            self.state.status = TuningStatus::Idle;
            self.state.dwell_start = None;
            self.log_transition(previous);
            return self.state.status;
        };

        self.state.smoothed_cents = cents;
        let offset = cents.abs();

        self.state.status = if previous == TuningStatus::InTune && offset <= self.exit_cents {
            TuningStatus::InTune
        } else if offset <= self.enter_cents {
            match self.state.dwell_start {
                Some(start) if previous != TuningStatus::Idle
                    && now.saturating_sub(start) >= self.min_dwell =>
                {
                    TuningStatus::InTune
                }
                Some(_) => TuningStatus::Tracking,
                None => {
                    self.state.dwell_start = Some(now);
                    TuningStatus::Tracking
                }
            }
        } else {
            self.state.dwell_start = None;
            TuningStatus::Tracking
        };

        self.log_transition(previous);
        self.state.status
    }

    fn log_transition(&self, previous: TuningStatus) {
        if previous != self.state.status {
            log::debug!(
                "[STATE] {:?} -> {:?} at {:+.1} cents",
                previous,
                self.state.status,
                self.state.smoothed_cents
            );
        }
    }
}
