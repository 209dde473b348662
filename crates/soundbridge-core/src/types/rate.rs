//! Producer/consumer rate ratio.

use serde::{Deserialize, Serialize};

/// Ratio between the emulated sample clock and the output device clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateRatio {
    /// Samples per second emitted by the emulation core.
    pub producer_rate: f64,
    /// Frames per second consumed by the output device.
    pub consumer_rate: u32,
}

impl RateRatio {
    pub const fn new(producer_rate: f64, consumer_rate: u32) -> Self {
        Self {
            producer_rate,
            consumer_rate,
        }
    }

    /// Number of producer samples that correspond to `frames` output frames,
    /// rounded down.
    pub fn input_samples_for(&self, frames: usize) -> usize {
        if self.consumer_rate == 0 {
            return 0;
        }
        (frames as f64 * self.producer_rate / f64::from(self.consumer_rate)).floor() as usize
    }

    /// Producer samples per output frame.
    pub fn ratio(&self) -> f64 {
        self.producer_rate / f64::from(self.consumer_rate)
    }
}

impl Default for RateRatio {
    fn default() -> Self {
        Self::new(1_786_830.0, 44_100)
    }
}
