//! # Tuner Session
//!
//! [`TunerSession`] owns one instance of every pipeline stage together with
//! the only long-lived mutable state (the Kalman filter and the tuning state
//! machine). One session serves one tuner; it is `Send` so it can be moved
//! onto a processing thread, but it is never shared.
//!
//! Per frame:
//! 1. estimate the pitch
//! 2. undo a 2nd-harmonic lock
//! 3. match the closest string
//! 4. smooth the cents offset
//! 5. advance the state machine
//! 6. derive guidance
//!
//! A missing estimate or match short-circuits straight to `Idle`.

use serde::Serialize;
use std::time::Instant;

use crate::config::TunerConfig;
use crate::error::{TunerError, TunerResult};
use crate::estimator::FrequencyEstimator;
use crate::frame::AudioFrame;
use crate::guidance::{Guidance, guidance};
use crate::harmonic::HarmonicCorrector;
use crate::instrument::InstrumentStringTable;
use crate::matcher::{NoteDetectionResult, StringMatcher};
use crate::pitch::{PitchDetector, PitchEstimate};
use crate::smoothing::{CentsSmoother, KalmanState};
use crate::state::{Timestamp, TuningState, TuningStateMachine, TuningStatus};

/// Everything the UI and haptics layers need about one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunerFrameResult {
    /// Detector output that passed the estimator's checks.
    pub raw_estimate: Option<PitchEstimate>,
    /// Matched string and raw offset.
    pub matched: Option<NoteDetectionResult>,
    /// Kalman estimate of the offset. Held at its last value while idle.
    pub smoothed_cents: f64,
    pub status: TuningStatus,
    /// `None` while idle.
    ///
    /// Tiers follow the smoothed offset alone. Inside the hysteresis band
    /// (between the enter and exit thresholds) an `InTune` status can carry
    /// a "Slightly Flat/Sharp" hint; the status stays authoritative.
    pub guidance: Option<Guidance>,
}

/// One tuner: configuration, pipeline stages and session state.
#[derive(Debug)]
pub struct TunerSession {
    config: TunerConfig,
    table: InstrumentStringTable,
    estimator: FrequencyEstimator,
    corrector: HarmonicCorrector,
    matcher: StringMatcher,
    smoother: CentsSmoother,
    kalman: KalmanState,
    state_machine: TuningStateMachine,
    clock_origin: Instant,
}

impl TunerSession {
    /// Builds a session. Fails if the configuration is invalid.
    pub fn new(config: TunerConfig, table: InstrumentStringTable) -> TunerResult<Self> {
        let estimator = FrequencyEstimator::new(&config)?;
        Ok(Self::assemble(config, table, estimator))
    }

    /// Builds a session around a caller-supplied pitch detector.
    pub fn with_detector(
        config: TunerConfig,
        table: InstrumentStringTable,
        detector: Box<dyn PitchDetector>,
    ) -> TunerResult<Self> {
        let estimator = FrequencyEstimator::with_detector(&config, detector)?;
        Ok(Self::assemble(config, table, estimator))
    }

    fn assemble(
        config: TunerConfig,
        table: InstrumentStringTable,
        estimator: FrequencyEstimator,
    ) -> Self {
        let smoother = CentsSmoother::from_config(&config);
        Self {
            corrector: HarmonicCorrector::from_config(&config),
            matcher: StringMatcher::from_config(&config),
            kalman: smoother.initial_state(),
            state_machine: TuningStateMachine::from_config(&config),
            smoother,
            estimator,
            table,
            config,
            clock_origin: Instant::now(),
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn table(&self) -> &InstrumentStringTable {
        &self.table
    }

    pub fn kalman_state(&self) -> &KalmanState {
        &self.kalman
    }

    pub fn tuning_state(&self) -> &TuningState {
        self.state_machine.state()
    }

    pub fn status(&self) -> TuningStatus {
        self.state_machine.status()
    }

    /// Clears smoothing and status. Configuration and table are kept.
    pub fn reset(&mut self) {
        self.smoother.reset(&mut self.kalman);
        self.state_machine.reset();
        log::debug!("[SESSION] state reset");
    }

    /// Switches to another instrument. Always resets.
    pub fn set_instrument_table(&mut self, table: InstrumentStringTable) {
        log::info!("[SESSION] instrument table -> {}", table.name());
        self.table = table;
        self.reset();
    }

    /// Processes a frame stamped with the session clock.
    pub fn process(&mut self, frame: &AudioFrame) -> TunerResult<TunerFrameResult> {
        let now = self.clock_origin.elapsed();
        self.process_at(frame, now)
    }

    /// Processes a frame stamped with `now`. Timestamps must not go backwards.
    pub fn process_at(&mut self, frame: &AudioFrame, now: Timestamp) -> TunerResult<TunerFrameResult> {
        self.check_frame(frame)?;

        let raw_estimate = self.estimator.estimate(frame);

        let matched = raw_estimate.and_then(|estimate| {
            let (freq, corrected) = self.corrector.correct(estimate.frequency, &self.table);
            self.matcher
                .match_closest(freq, &self.table)
                .map(|result| NoteDetectionResult {
                    was_harmonic_corrected: corrected,
                    ..result
                })
        });

        let smoothed_cents = match &matched {
            Some(result) => self.smoother.update(&mut self.kalman, result.cents_offset),
            None => self.kalman.estimate,
        };

        let status = self
            .state_machine
            .update(matched.map(|_| smoothed_cents), now);

        let guidance = match (&matched, status) {
            (_, TuningStatus::Idle) | (None, _) => None,
            (Some(result), _) => Some(guidance(smoothed_cents, result.direction)),
        };

        if raw_estimate.is_none() {
            log::trace!("[SESSION] no pitch");
        }

        Ok(TunerFrameResult {
            raw_estimate,
            matched,
            smoothed_cents,
            status,
            guidance,
        })
    }

    fn check_frame(&self, frame: &AudioFrame) -> TunerResult<()> {
        if frame.sample_rate() != self.config.sample_rate {
            return Err(TunerError::SampleRate {
                expected: self.config.sample_rate,
                actual: frame.sample_rate(),
            });
        }
        if frame.len() != self.config.window_size {
            return Err(TunerError::FrameLength {
                expected: self.config.window_size,
                actual: frame.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Detector whose answer the test can change between frames.
    #[derive(Clone, Default)]
    struct Scripted(Arc<Mutex<Option<f64>>>);

    impl Scripted {
        fn set(&self, frequency: Option<f64>) {
            *self.0.lock().expect("lock") = frequency;
        }
    }

    impl PitchDetector for Scripted {
        fn detect(&mut self, _signal: &[f32], _sample_rate: u32) -> Option<PitchEstimate> {
            self.0.lock().expect("lock").map(|frequency| PitchEstimate {
                frequency,
                clarity: 0.99,
            })
        }
    }

    fn scripted_session() -> (TunerSession, Scripted) {
        let detector = Scripted::default();
        let session = TunerSession::with_detector(
            TunerConfig::default(),
            Instrument::GuitarStandard.table().clone(),
            Box::new(detector.clone()),
        )
        .expect("valid session");
        (session, detector)
    }

    fn loud_frame() -> AudioFrame {
        let samples: Vec<f32> = (0..4096).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        AudioFrame::new(samples, 44_100)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn rejects_malformed_frames() {
        let (mut session, _) = scripted_session();
        let short = AudioFrame::new(vec![0.0f32; 1024], 44_100);
        assert_eq!(
            session.process_at(&short, ms(0)),
            Err(TunerError::FrameLength {
                expected: 4096,
                actual: 1024
            })
        );
        let wrong_rate = AudioFrame::new(vec![0.0f32; 4096], 48_000);
        assert_eq!(
            session.process_at(&wrong_rate, ms(0)),
            Err(TunerError::SampleRate {
                expected: 44_100,
                actual: 48_000
            })
        );
    }

    #[test]
    fn no_estimate_is_idle_without_guidance() {
        let (mut session, detector) = scripted_session();
        detector.set(None);
        let result = session.process_at(&loud_frame(), ms(0)).expect("frame");
        assert_eq!(result.status, TuningStatus::Idle);
        assert!(result.matched.is_none());
        assert!(result.guidance.is_none());
    }

    #[test]
    fn harmonic_flag_reaches_the_result() {
        let (mut session, detector) = scripted_session();
        detector.set(Some(220.0));
        let result = session.process_at(&loud_frame(), ms(0)).expect("frame");
        let matched = result.matched.expect("match");
        assert_eq!(matched.matched_string.label(), "A2");
        assert!(matched.was_harmonic_corrected);
    }

    #[test]
    fn unmatched_pitch_is_idle_and_keeps_the_needle() {
        let (mut session, detector) = scripted_session();
        detector.set(Some(110.5));
        let first = session.process_at(&loud_frame(), ms(0)).expect("frame");
        assert_eq!(first.status, TuningStatus::Tracking);

        // 600 Hz: no string within 400 cents and its half is no string either.
        detector.set(Some(600.0));
        let second = session.process_at(&loud_frame(), ms(33)).expect("frame");
        assert!(second.raw_estimate.is_some());
        assert!(second.matched.is_none());
        assert_eq!(second.status, TuningStatus::Idle);
        assert_eq!(second.smoothed_cents, first.smoothed_cents);
    }

    #[test]
    fn in_tune_inside_the_exit_band_still_hints() {
        let (mut session, detector) = scripted_session();
        detector.set(Some(110.0));
        for frame in 0..5 {
            session.process_at(&loud_frame(), ms(frame * 33)).expect("frame");
        }
        assert_eq!(session.status(), TuningStatus::InTune);

        // 6.5 cents sharp: past the enter threshold, short of the exit one.
        detector.set(Some(crate::tuning::frequency_at_cents(110.0, 6.5)));
        let mut last = None;
        for frame in 5..30 {
            last = Some(session.process_at(&loud_frame(), ms(frame * 33)).expect("frame"));
        }
        let last = last.expect("frames processed");
        assert!(last.smoothed_cents > 5.0 && last.smoothed_cents < 8.0);
        assert_eq!(last.status, TuningStatus::InTune);
        let guidance = last.guidance.expect("guidance");
        assert_eq!(guidance.message, "Slightly Sharp");
        assert_eq!(guidance.action, crate::guidance::TuningAction::Loosen);
    }

    #[test]
    fn reset_clears_smoothing_and_status() {
        let (mut session, detector) = scripted_session();
        detector.set(Some(112.0));
        for frame in 0..5 {
            session.process_at(&loud_frame(), ms(frame * 33)).expect("frame");
        }
        assert_ne!(session.kalman_state().estimate, 0.0);
        assert_eq!(session.status(), TuningStatus::Tracking);

        session.reset();
        assert_eq!(session.kalman_state().estimate, 0.0);
        assert_eq!(session.kalman_state().error_covariance, 1.0);
        assert_eq!(session.status(), TuningStatus::Idle);
        assert_eq!(session.tuning_state().dwell_start, None);
    }

    #[test]
    fn switching_instrument_resets() {
        let (mut session, detector) = scripted_session();
        detector.set(Some(110.0));
        session.process_at(&loud_frame(), ms(0)).expect("frame");
        session.process_at(&loud_frame(), ms(100)).expect("frame");
        assert_eq!(session.status(), TuningStatus::InTune);

        session.set_instrument_table(Instrument::Bass4.table().clone());
        assert_eq!(session.status(), TuningStatus::Idle);
        assert_eq!(session.table().name(), "bass4");

        let result = session.process_at(&loud_frame(), ms(133)).expect("frame");
        // 110 Hz is A2, an octave above the bass A1; half of it matches A1.
        let matched = result.matched.expect("match");
        assert_eq!(matched.matched_string.label(), "A1");
        assert!(matched.was_harmonic_corrected);
        assert_eq!(result.status, TuningStatus::Tracking);
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let config = TunerConfig {
            in_tune_enter_cents: 10.0,
            in_tune_exit_cents: 5.0,
            ..TunerConfig::default()
        };
        assert!(matches!(
            TunerSession::new(config, Instrument::GuitarStandard.table().clone()),
            Err(TunerError::InvertedHysteresis { .. })
        ));
    }

    #[test]
    fn degenerate_analysis_rate_refuses_to_start() {
        let config = TunerConfig {
            analysis_rate_hz: 1e-20,
            ..TunerConfig::default()
        };
        assert_eq!(
            TunerSession::new(config, Instrument::GuitarStandard.table().clone()).unwrap_err(),
            TunerError::InvalidAnalysisRate(1e-20)
        );
    }
}
