// tuner-core/src/lib.rs

//! The core logic for the chromatic tuner.
//! This crate turns a stream of mono audio frames into a stable tuning
//! judgment: which string is being played, how far off it is, and whether
//! it is in tune. It is completely headless and contains no UI code.
//!
//! ## Pipeline
//! [`FrequencyEstimator`] → [`HarmonicCorrector`] → [`StringMatcher`] →
//! [`CentsSmoother`] → [`TuningStateMachine`] → [`guidance`], all owned by a
//! [`TunerSession`]. [`TunerWorker`] runs a session on its own thread.
//!
//! ```no_run
//! use tuner_core::{AudioFrame, Instrument, TunerSession};
//!
//! let instrument = Instrument::GuitarStandard;
//! let mut session =
//!     TunerSession::new(instrument.recommended_config(), instrument.table().clone())?;
//!
//! let frame = AudioFrame::new(vec![0.0f32; 4096], 44_100);
//! let result = session.process(&frame)?;
//! println!("{:?} {:+.1} cents", result.status, result.smoothed_cents);
//! # Ok::<(), tuner_core::TunerError>(())
//! ```
//!
//! ## Features
//! - `capture`: microphone input through cpal ([`audio`] module)

#[cfg(feature = "capture")]
pub mod audio;
pub mod config;
pub mod error;
pub mod estimator;
pub mod fft;
pub mod frame;
pub mod guidance;
pub mod harmonic;
pub mod instrument;
pub mod matcher;
pub mod pitch;
pub mod session;
pub mod smoothing;
pub mod state;
pub mod throttle;
pub mod tuning;
pub mod worker;

pub use config::{DetectorKind, TunerConfig};
pub use error::{TunerError, TunerResult};
pub use estimator::FrequencyEstimator;
pub use frame::{AudioFrame, FrameAssembler};
pub use guidance::{Guidance, TuningAction, Urgency, guidance};
pub use harmonic::HarmonicCorrector;
pub use instrument::{Instrument, InstrumentStringTable, StringConfig};
pub use matcher::{Direction, NoteDetectionResult, StringMatcher};
pub use pitch::{McLeodDetector, PitchDetector, PitchEstimate, YinDetector};
pub use session::{TunerFrameResult, TunerSession};
pub use smoothing::{CentsSmoother, KalmanState};
pub use state::{Timestamp, TuningState, TuningStateMachine, TuningStatus};
pub use throttle::FrameThrottle;
pub use tuning::NoteName;
pub use worker::TunerWorker;
