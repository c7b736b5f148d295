//! Live tuner on the default microphone.
//!
//! ```text
//! cargo run -p chromatic-tuner-core --features capture --example live_tuner -- bass4 20
//! ```
//!
//! Arguments: instrument (`guitar`, `bass4`, `bass5`, `chromatic`) and run
//! time in seconds. Set `RUST_LOG=debug` to see state transitions.

use std::time::{Duration, Instant};
use tuner_core::{Instrument, TunerSession, TunerWorker, TuningStatus, audio};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let instrument: Instrument = args.next().as_deref().unwrap_or("guitar").parse()?;
    let seconds: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(30);

    let config = instrument.recommended_config();
    let session = TunerSession::new(config.clone(), instrument.table().clone())?;

    let (frames_tx, frames_rx) = crossbeam_channel::bounded(4);
    let stream = audio::start_audio_capture(&config, frames_tx)?;
    let worker = TunerWorker::start(session, frames_rx);

    println!("Tuning {instrument} for {seconds}s, play a string...");
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut last_status = TuningStatus::Idle;

    while Instant::now() < deadline {
        let Ok(result) = worker.results().recv_timeout(Duration::from_millis(250)) else {
            continue;
        };

        match (&result.matched, &result.guidance) {
            (Some(matched), Some(guidance)) => println!(
                "{:>4} {:+6.1} cents  {:<15} {:?}",
                matched.matched_string.label(),
                result.smoothed_cents,
                guidance.message,
                guidance.action,
            ),
            _ if last_status != TuningStatus::Idle => println!("   -"),
            _ => {}
        }
        last_status = result.status;
    }

    drop(stream);
    worker.stop()?;
    Ok(())
}
