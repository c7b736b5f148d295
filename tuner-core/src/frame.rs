//! # Audio Frames
//!
//! [`AudioFrame`] is the unit of work of the pipeline: one analysis window of
//! mono samples together with the rate it was captured at. Frames are
//! immutable once built.
//!
//! [`FrameAssembler`] sits on the capture side. Audio callbacks deliver
//! buffers of whatever size the backend likes; the assembler keeps the most
//! recent `window_size` samples and hands out a frame every `hop_size` new
//! samples. When a callback delivers several hops at once only the newest
//! window is emitted, so a slow consumer never builds up a backlog.

use std::sync::Arc;

/// One analysis window of mono samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root mean square level of the frame.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let energy: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (energy / self.samples.len() as f64).sqrt()
    }
}

/// Accumulates capture callbacks into overlapping analysis windows.
#[derive(Debug)]
pub struct FrameAssembler {
    window_size: usize,
    hop_size: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
    pending: usize,
}

impl FrameAssembler {
    pub fn new(window_size: usize, hop_size: usize, sample_rate: u32) -> Self {
        Self {
            window_size,
            hop_size: hop_size.max(1),
            sample_rate,
            buffer: Vec::with_capacity(window_size * 2),
            pending: 0,
        }
    }

    /// Appends samples and returns a frame if a new window is due.
    pub fn push(&mut self, samples: &[f32]) -> Option<AudioFrame> {
        self.buffer.extend_from_slice(samples);
        self.pending += samples.len();

        // Only the newest window is ever needed.
        if self.buffer.len() > self.window_size {
            let excess = self.buffer.len() - self.window_size;
            self.buffer.drain(..excess);
        }

        if self.buffer.len() < self.window_size || self.pending < self.hop_size {
            return None;
        }

        self.pending = 0;
        Some(AudioFrame::new(self.buffer.as_slice(), self.sample_rate))
    }
}
