//! # Audio Capture Module
//!
//! Feeds the tuner from the default input device using CPAL (Cross-Platform
//! Audio Library). Only compiled with the `capture` feature.
//!
//! ## Features
//! - Default input device, 32-bit float samples
//! - Multi-channel input downmixed to mono
//! - Callbacks assembled into overlapping analysis windows at the
//!   configured analysis rate
//! - Frames dropped, never queued, when the consumer is behind

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};

use crate::config::TunerConfig;
use crate::frame::{AudioFrame, FrameAssembler};

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 stream format that supports the configured sample rate
/// 3. Streams analysis windows to `sender` from the audio callback
///
/// The returned stream must be kept alive; dropping it stops capture.
/// No resampling is done: a device that cannot run at the configured rate
/// is an error.
pub fn start_audio_capture(config: &TunerConfig, sender: Sender<AudioFrame>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[CAPTURE] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate).ok_or_else(|| {
        anyhow!(
            "No f32 input format supports {} Hz (resampling is not supported)",
            config.sample_rate
        )
    })?;

    let stream_config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(config.sample_rate))
        .into();
    let channels = stream_config.channels.max(1) as usize;

    log::info!(
        "[CAPTURE] {} Hz, {} channel(s), window {} / hop {}",
        config.sample_rate,
        channels,
        config.window_size,
        config.hop_size()
    );

    let mut assembler = FrameAssembler::new(config.window_size, config.hop_size(), config.sample_rate);
    let mut mono = Vec::new();

    let err_fn = |err| log::error!("[CAPTURE] An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let samples = if channels == 1 {
                data
            } else {
                downmix(data, channels, &mut mono);
                mono.as_slice()
            };

            if let Some(frame) = assembler.push(samples) {
                match sender.try_send(frame) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => {
                        log::trace!("[CAPTURE] frame receiver gone");
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(stream)
}

/// Averages interleaved channels into `out`.
fn downmix(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        data.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
    );
}

/// Finds an f32 input configuration whose rate range contains `target_rate`,
/// preferring the fewest channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
}
