//! # Tuner Worker
//!
//! Runs a [`TunerSession`] on a dedicated thread fed by a frame channel.
//!
//! ## Architecture
//! - **Capture side**: pushes [`AudioFrame`]s into a crossbeam channel
//! - **Worker thread**: waits on frames and a shutdown signal with `select!`,
//!   keeps only the newest queued frame, drops frames that arrive faster than
//!   the analysis rate, and publishes one [`TunerFrameResult`] per processed
//!   frame
//! - **Consumer**: polls [`TunerWorker::results`]; when it falls behind, the
//!   oldest queued result is displaced so the newest is always available
//!
//! [`TunerWorker::stop`] is synchronous: it returns only after the thread has
//! exited, handing back the session already reset.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{TunerError, TunerResult};
use crate::frame::AudioFrame;
use crate::session::{TunerFrameResult, TunerSession};
use crate::throttle::FrameThrottle;

/// Results buffered for a slow consumer before the oldest are displaced.
const RESULT_QUEUE_DEPTH: usize = 4;

/// Handle to a running processing thread.
#[derive(Debug)]
pub struct TunerWorker {
    shutdown_tx: Sender<()>,
    results_rx: Receiver<TunerFrameResult>,
    thread_handle: JoinHandle<TunerSession>,
}

impl TunerWorker {
    /// Moves `session` onto a new thread that processes frames from `frames`.
    pub fn start(session: TunerSession, frames: Receiver<AudioFrame>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (results_tx, results_rx) = crossbeam_channel::bounded(RESULT_QUEUE_DEPTH);

        let stale_rx = results_rx.clone();
        let thread_handle = thread::spawn(move || {
            run(session, frames, shutdown_rx, results_tx, stale_rx)
        });

        Self {
            shutdown_tx,
            results_rx,
            thread_handle,
        }
    }

    /// Channel carrying one result per processed frame.
    pub fn results(&self) -> &Receiver<TunerFrameResult> {
        &self.results_rx
    }

    /// Stops the thread, detaching it from the frame source, and returns
    /// the session with its smoothing and tuning state cleared.
    pub fn stop(self) -> TunerResult<TunerSession> {
        // The thread may already have exited if the frame source closed.
        let _ = self.shutdown_tx.send(());
        let mut session = self
            .thread_handle
            .join()
            .map_err(|_| TunerError::WorkerPanicked)?;
        session.reset();
        log::info!("[WORKER] stopped");
        Ok(session)
    }
}

fn run(
    mut session: TunerSession,
    frames: Receiver<AudioFrame>,
    shutdown_rx: Receiver<()>,
    results_tx: Sender<TunerFrameResult>,
    stale_rx: Receiver<TunerFrameResult>,
) -> TunerSession {
    log::info!("[WORKER] processing loop started");
    let origin = Instant::now();
    let mut throttle = FrameThrottle::new(session.config().analysis_interval());

    loop {
        crossbeam_channel::select! {
            recv(frames) -> msg => match msg {
                Ok(frame) => {
                    // Coalesce: anything queued behind this frame is newer.
                    let frame = frames.try_iter().last().unwrap_or(frame);
                    if !throttle.admit(origin.elapsed()) {
                        continue;
                    }
                    match session.process(&frame) {
                        Ok(result) => publish(&results_tx, &stale_rx, result),
                        Err(e) => log::warn!("[WORKER] frame rejected: {e}"),
                    }
                }
                Err(_) => {
                    log::info!("[WORKER] frame source closed");
                    break;
                }
            },
            // Also fires when the handle is dropped without `stop`.
            recv(shutdown_rx) -> _ => {
                log::info!("[WORKER] received shutdown signal");
                break;
            },
        }
    }

    session
}

/// Queues `result`, displacing the oldest queued result if the consumer lags.
fn publish(
    results_tx: &Sender<TunerFrameResult>,
    stale_rx: &Receiver<TunerFrameResult>,
    result: TunerFrameResult,
) {
    if let Err(TrySendError::Full(result)) = results_tx.try_send(result) {
        let _ = stale_rx.try_recv();
        if results_tx.try_send(result).is_err() {
            log::trace!("[WORKER] result queue contended, frame result dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TunerConfig;
    use crate::instrument::Instrument;
    use crate::state::TuningStatus;
    use std::time::Duration;

    fn sine_frame(freq: f64) -> AudioFrame {
        let samples: Vec<f32> = (0..4096)
            .map(|i| (0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / 44_100.0).sin()) as f32)
            .collect();
        AudioFrame::new(samples, 44_100)
    }

    fn session() -> TunerSession {
        TunerSession::new(
            TunerConfig::default(),
            Instrument::GuitarStandard.table().clone(),
        )
        .expect("valid session")
    }

    #[test]
    fn processes_frames_and_stops_clean() {
        let (frames_tx, frames_rx) = crossbeam_channel::bounded(4);
        let worker = TunerWorker::start(session(), frames_rx);

        frames_tx.send(sine_frame(110.0)).expect("send");
        let result = worker
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("result");
        let matched = result.matched.expect("match");
        assert_eq!(matched.matched_string.label(), "A2");
        assert_eq!(result.status, TuningStatus::Tracking);

        let session = worker.stop().expect("clean stop");
        assert_eq!(session.status(), TuningStatus::Idle);
        assert_eq!(session.kalman_state().estimate, 0.0);
    }

    #[test]
    fn frames_faster_than_the_analysis_rate_are_dropped() {
        let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
        let worker = TunerWorker::start(session(), frames_rx);

        for _ in 0..10 {
            frames_tx.send(sine_frame(110.0)).expect("send");
        }
        thread::sleep(Duration::from_millis(200));
        let delivered = worker.results().try_iter().count();
        assert!((1..10).contains(&delivered), "{delivered} results");

        worker.stop().expect("clean stop");
    }

    #[test]
    fn lagging_consumer_sees_the_newest_result() {
        let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
        let worker = TunerWorker::start(session(), frames_rx);

        // More results than the queue holds, spaced beyond the throttle.
        for freq in [110.0, 110.0, 110.0, 110.0, 110.0, 196.0] {
            frames_tx.send(sine_frame(freq)).expect("send");
            thread::sleep(Duration::from_millis(60));
        }
        thread::sleep(Duration::from_millis(300));

        let queued: Vec<_> = worker.results().try_iter().collect();
        assert!(queued.len() <= RESULT_QUEUE_DEPTH);
        let last = queued.last().and_then(|r| r.matched).expect("match");
        assert_eq!(last.matched_string.label(), "G3");

        worker.stop().expect("clean stop");
    }

    #[test]
    fn closing_the_source_ends_the_thread() {
        let (frames_tx, frames_rx) = crossbeam_channel::bounded::<AudioFrame>(1);
        let worker = TunerWorker::start(session(), frames_rx);
        drop(frames_tx);
        assert!(worker.stop().is_ok());
    }

    #[test]
    fn restart_begins_from_a_clean_slate() {
        let (frames_tx, frames_rx) = crossbeam_channel::bounded(4);
        let worker = TunerWorker::start(session(), frames_rx.clone());
        frames_tx.send(sine_frame(112.0)).expect("send");
        worker
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("result");
        let session = worker.stop().expect("clean stop");

        let worker = TunerWorker::start(session, frames_rx);
        frames_tx.send(sine_frame(82.41)).expect("send");
        let result = worker
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("result");
        // A fresh filter's first step from 0 towards ~0 cents stays near 0.
        assert!(result.smoothed_cents.abs() < 1.0, "{}", result.smoothed_cents);
        worker.stop().expect("clean stop");
    }
}
