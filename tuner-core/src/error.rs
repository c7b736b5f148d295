//! Error types for the tuner core.
//!
//! Only configuration problems and malformed frames are errors. A frame with
//! no discernible pitch is an ordinary `None` further down the pipeline.

use thiserror::Error;

/// Tuner core errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TunerError {
    /// Sample rate of zero
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Analysis window cannot hold enough periods of the lowest frequency
    #[error("Analysis window of {window} samples is too short for {min_frequency} Hz (need at least {required})")]
    WindowTooShort {
        window: usize,
        min_frequency: f64,
        required: usize,
    },

    /// Analysis window beyond the largest supported FFT size
    #[error("Analysis window of {window} samples exceeds the maximum of {max}")]
    WindowTooLong { window: usize, max: usize },

    /// Frequency bounds inverted, non-positive or above Nyquist
    #[error("Invalid frequency range: {min} - {max} Hz at sample rate {sample_rate}")]
    InvalidFrequencyRange { min: f64, max: f64, sample_rate: u32 },

    /// A ratio or clarity threshold outside [0, 1]
    #[error("Threshold `{name}` must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    /// A cents threshold that is negative or not finite
    #[error("Cents threshold `{name}` must be a non-negative number, got {value}")]
    InvalidCentsThreshold { name: &'static str, value: f64 },

    /// In-tune exit band narrower than the enter band
    #[error("In-tune exit threshold ({exit} cents) must not be below the enter threshold ({enter} cents)")]
    InvertedHysteresis { enter: f64, exit: f64 },

    /// Kalman noise parameter that is not strictly positive
    #[error("Kalman parameter `{name}` must be positive, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },

    /// Analysis rate below 1 Hz or above the sample rate
    #[error("Analysis rate must lie between 1 Hz and the sample rate, got {0} Hz")]
    InvalidAnalysisRate(f64),

    /// Instrument table without strings
    #[error("Instrument table is empty")]
    EmptyTable,

    /// Target frequency that is not a positive number
    #[error("String {ordinal} has an invalid target frequency: {frequency} Hz")]
    InvalidTarget { ordinal: u8, frequency: f64 },

    /// Two strings closer than the duplicate tolerance
    #[error("Strings {first} and {second} are only {cents:.1} cents apart")]
    DuplicateString { first: u8, second: u8, cents: f64 },

    /// Unknown instrument name
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Frame length differs from the configured window
    #[error("Frame has {actual} samples, expected {expected}")]
    FrameLength { expected: usize, actual: usize },

    /// Frame sample rate differs from the configured rate
    #[error("Frame sampled at {actual} Hz, expected {expected} Hz")]
    SampleRate { expected: u32, actual: u32 },

    /// Configuration file could not be read or parsed
    #[error("Configuration could not be loaded: {0}")]
    ConfigLoad(String),

    /// Processing thread died before it could hand the session back
    #[error("Tuner worker thread panicked")]
    WorkerPanicked,
}

/// Result type for tuner operations
pub type TunerResult<T> = Result<T, TunerError>;
