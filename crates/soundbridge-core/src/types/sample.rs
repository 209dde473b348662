//! Sample representation and normalization.

use serde::{Deserialize, Serialize};

/// One 16-bit mono sample as emitted by the emulated sound hardware.
pub type Sample = u16;

/// How the 16 bits of a [`Sample`] are interpreted when converted to an
/// amplitude.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Unsigned level in `0..=65535`, mapped onto `[0, 1)`.
    #[default]
    Unsigned,
    /// Two's complement level, mapped onto `[-1, 1)`.
    Signed,
}

impl SampleEncoding {
    /// Convert a sample to a floating-point amplitude.
    pub fn normalize(self, sample: Sample) -> f32 {
        match self {
            Self::Unsigned => f32::from(sample) / 65536.0,
            Self::Signed => f32::from(i16::from_ne_bytes(sample.to_ne_bytes())) / 32768.0,
        }
    }

    /// Convert a sample to signed 16-bit PCM, re-centring unsigned levels.
    pub fn to_pcm(self, sample: Sample) -> i16 {
        match self {
            Self::Unsigned => (i32::from(sample) - 32768) as i16,
            Self::Signed => i16::from_ne_bytes(sample.to_ne_bytes()),
        }
    }
}
