//! Square-wave stand-in for an emulated pulse channel.

use soundbridge_core::{Sample, SampleEncoding, SampleSource};

/// Emits a fixed-frequency square wave at the producer rate.
///
/// Samples accumulate as [`SquareWave::emulate`] advances the clock and are
/// collected through [`SampleSource::produce_samples`], like an emulated APU.
#[derive(Debug, Clone)]
pub struct SquareWave {
    producer_rate: f64,
    /// Samples per half cycle.
    half_period: f64,
    phase: f64,
    high: bool,
    levels: (Sample, Sample),
    pending: Vec<Sample>,
}

impl SquareWave {
    pub fn new(producer_rate: f64, tone_hz: f64, encoding: SampleEncoding) -> Self {
        let levels = match encoding {
            SampleEncoding::Unsigned => (8_192, 24_576),
            SampleEncoding::Signed => (-8_192i16 as Sample, 8_192),
        };

        Self {
            producer_rate,
            half_period: (producer_rate / (2.0 * tone_hz.max(1.0))).max(1.0),
            phase: 0.0,
            high: false,
            levels,
            pending: Vec::new(),
        }
    }

    /// Run the wave forward by `samples` producer samples.
    pub fn emulate(&mut self, samples: usize) {
        self.pending.reserve(samples);
        for _ in 0..samples {
            self.pending.push(if self.high { self.levels.1 } else { self.levels.0 });
            self.phase += 1.0;
            if self.phase >= self.half_period {
                self.phase -= self.half_period;
                self.high = !self.high;
            }
        }
    }

    /// Samples emulated but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl SampleSource for SquareWave {
    fn produce_samples(&mut self, out: &mut Vec<Sample>) {
        out.append(&mut self.pending);
    }

    fn producer_rate(&self) -> f64 {
        self.producer_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_toggles_every_half_period() {
        // 8 samples per second at 1 Hz: four low, four high.
        let mut wave = SquareWave::new(8.0, 1.0, SampleEncoding::Unsigned);
        wave.emulate(10);
        assert_eq!(wave.pending(), 10);

        let mut out = Vec::new();
        wave.produce_samples(&mut out);
        assert_eq!(
            out,
            vec![8_192, 8_192, 8_192, 8_192, 24_576, 24_576, 24_576, 24_576, 8_192, 8_192]
        );
        assert_eq!(wave.pending(), 0);
    }

    #[test]
    fn test_signed_levels_are_symmetric() {
        let mut wave = SquareWave::new(4.0, 1.0, SampleEncoding::Signed);
        wave.emulate(4);

        let mut out = Vec::new();
        wave.produce_samples(&mut out);
        let amplitudes: Vec<f32> = out
            .iter()
            .map(|&s| SampleEncoding::Signed.normalize(s))
            .collect();
        assert_eq!(amplitudes, vec![-0.25, -0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_produce_appends() {
        let mut wave = SquareWave::new(1_786_830.0, 440.0, SampleEncoding::Unsigned);
        let mut out = vec![1];
        wave.emulate(3);
        wave.produce_samples(&mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 1);
        assert!((wave.producer_rate() - 1_786_830.0).abs() < f64::EPSILON);
    }
}
