//! WAV capture of produced samples.
//!
//! Samples arrive at the producer rate and are written at a standard file
//! rate by sample-and-hold, the same nearest-neighbor picking the renderer
//! uses. Recording stops on its own once the length limit is reached.

use soundbridge_core::{Result, Sample, SampleEncoding};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default recording length.
pub const RECORD_LIMIT_SECS: u32 = 60;

type Writer = hound::WavWriter<BufWriter<File>>;

/// Writes produced samples to a 16-bit mono WAV file.
pub struct WavRecorder {
    writer: Option<Writer>,
    path: PathBuf,
    encoding: SampleEncoding,
    source_rate: f64,
    target_rate: f64,
    /// Accumulated target-rate phase, in source-rate units.
    phase: f64,
    written: usize,
    limit: usize,
}

impl WavRecorder {
    /// Start a recording at `path`, resampling from `source_rate` to
    /// `target_rate` and stopping after `limit_secs` seconds of output.
    pub fn create(
        path: impl AsRef<Path>,
        source_rate: f64,
        target_rate: u32,
        encoding: SampleEncoding,
        limit_secs: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: target_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&path, spec)?;

        info!("Recording audio to {}", path.display());

        Ok(Self {
            writer: Some(writer),
            path,
            encoding,
            source_rate,
            target_rate: f64::from(target_rate),
            phase: 0.0,
            written: 0,
            limit: target_rate as usize * limit_secs as usize,
        })
    }

    /// Whether the length limit has been reached.
    pub const fn is_full(&self) -> bool {
        self.written >= self.limit
    }

    /// Record a batch of produced samples. Returns how many file samples
    /// were written; zero once the recording is full.
    pub fn record(&mut self, samples: &[Sample]) -> Result<usize> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(0);
        };

        let before = self.written;
        for &sample in samples {
            self.phase += self.target_rate;
            while self.phase >= self.source_rate {
                if self.written >= self.limit {
                    return Ok(self.written - before);
                }
                writer.write_sample(self.encoding.to_pcm(sample))?;
                self.written += 1;
                self.phase -= self.source_rate;
            }
        }

        Ok(self.written - before)
    }

    /// Flush and close the file. Returns the number of samples written.
    pub fn finish(mut self) -> Result<usize> {
        self.finalize()?;
        Ok(self.written)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!(
                "Finished recording {} ({} samples)",
                self.path.display(),
                self.written
            );
        }
        Ok(())
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!("Failed to finish recording {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_back(path: &Path) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i16>().map(|sample| sample.unwrap()).collect();
        (spec, samples)
    }

    #[test]
    fn test_decimates_to_target_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.wav");

        let mut recorder = WavRecorder::create(&path, 4.0, 2, SampleEncoding::Signed, 60).unwrap();
        assert_eq!(recorder.record(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(), 4);
        assert_eq!(recorder.finish().unwrap(), 4);

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_unsigned_samples_are_recentred() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unsigned.wav");

        let mut recorder =
            WavRecorder::create(&path, 8.0, 8, SampleEncoding::Unsigned, 60).unwrap();
        recorder.record(&[0, 32768, 65535]).unwrap();
        recorder.finish().unwrap();

        let (_, samples) = read_back(&path);
        assert_eq!(samples, vec![-32768, 0, 32767]);
    }

    #[test]
    fn test_stops_at_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("limited.wav");

        let mut recorder = WavRecorder::create(&path, 3.0, 3, SampleEncoding::Signed, 1).unwrap();
        assert_eq!(recorder.record(&[1, 2]).unwrap(), 2);
        assert_eq!(recorder.record(&[3, 4, 5]).unwrap(), 1);
        assert!(recorder.is_full());
        assert_eq!(recorder.record(&[6]).unwrap(), 0);
        drop(recorder);

        let (_, samples) = read_back(&path);
        assert_eq!(samples, vec![1, 2, 3]);
    }
}
