//! Rate limiter in front of the pipeline.

use std::time::Duration;

/// Admits at most one frame per `interval`. Early frames are dropped.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_admitted: Option<Duration>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    /// Returns `true` if a frame arriving at `now` should be processed.
    pub fn admit(&mut self, now: Duration) -> bool {
        match self.last_admitted {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last_admitted = Some(now);
                true
            }
        }
    }
}
