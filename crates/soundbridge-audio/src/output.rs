//! Audio output using cpal.

use crate::render::{RenderContext, RenderOutcome};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig,
};
use soundbridge_core::{Error, Result, TransportConfig};
use tracing::{debug, error, info, warn};

/// Audio output stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Fixed callback size in frames. `None` uses the host default.
    pub buffer_size: Option<u32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            buffer_size: None,
        }
    }
}

impl From<&TransportConfig> for OutputConfig {
    fn from(config: &TransportConfig) -> Self {
        Self {
            sample_rate: config.consumer_rate,
            channels: config.channels,
            buffer_size: config.quantum_frames,
        }
    }
}

impl OutputConfig {
    fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            channels: self.channels,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: self
                .buffer_size
                .map_or(BufferSize::Default, BufferSize::Fixed),
        }
    }
}

/// Audio output stream wrapper.
///
/// The stream's callback owns the [`RenderContext`]; dropping the output
/// stops the callback and releases the ring buffer with it.
pub struct AudioOutput {
    stream: Stream,
    config: OutputConfig,
    device_name: String,
}

impl AudioOutput {
    /// Create a new audio output with the default device.
    pub fn new(context: RenderContext, config: OutputConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {device_name}");

        Self::with_device(device, context, config)
    }

    /// Create a new audio output with a specific device.
    ///
    /// The requested rate and channel count are used when the device supports
    /// them. Otherwise the device default is used and the renderer is retuned
    /// to the rate actually granted.
    #[allow(clippy::needless_pass_by_value)] // Device is typically moved
    pub fn with_device(device: Device, mut context: RenderContext, requested: OutputConfig) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let (config, sample_format) = negotiate(&device, &requested)?;

        if config.sample_rate != requested.sample_rate {
            context.set_consumer_rate(config.sample_rate);
        }
        let stream_config = config.stream_config();

        debug!(
            "Output config: {}Hz, {} channels, buffer {:?}, {:?}",
            config.sample_rate, config.channels, config.buffer_size, sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, context)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, context)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, context)?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        Ok(Self {
            stream,
            config,
            device_name,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mut context: RenderContext,
    ) -> Result<Stream> {
        let channels = usize::from(config.channels);
        let mut starved = false;

        let err_fn = |err| {
            error!("Audio stream error: {err}");
        };

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let outcome =
                        context.process_interleaved(data, channels, |amplitude| T::from_sample(amplitude));

                    // Log transitions only; the callback runs every few milliseconds.
                    match outcome {
                        RenderOutcome::Underrun if !starved => {
                            warn!("Buffer underrun: no samples for {} frames", data.len() / channels);
                            starved = true;
                        }
                        RenderOutcome::Rendered { consumed, .. } if starved && consumed > 0 => {
                            debug!("Audio resumed after underrun");
                            starved = false;
                        }
                        _ => {}
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))?;

        Ok(stream)
    }

    /// Stop invoking the render callback. Buffered samples are kept.
    pub fn pause(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {e}")))
    }

    /// Resume invoking the render callback.
    pub fn resume(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to resume stream: {e}")))
    }

    /// Get the device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Sample rate granted by the device.
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Channel count granted by the device.
    pub const fn channels(&self) -> u16 {
        self.config.channels
    }
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok(devices)
}

/// One supported stream configuration range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: SampleFormat,
}

const fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(3),
        SampleFormat::I16 => Some(2),
        SampleFormat::U16 => Some(1),
        _ => None,
    }
}

/// Best usable sample format for exactly `sample_rate` and `channels`.
fn pick_format(candidates: &[Candidate], sample_rate: u32, channels: u16) -> Option<SampleFormat> {
    candidates
        .iter()
        .filter(|c| c.channels == channels && (c.min_rate..=c.max_rate).contains(&sample_rate))
        .filter_map(|c| format_rank(c.format).map(|rank| (rank, c.format)))
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, format)| format)
}

/// Settle on the stream configuration and sample format to open.
fn negotiate(device: &Device, requested: &OutputConfig) -> Result<(OutputConfig, SampleFormat)> {
    let candidates: Vec<Candidate> = match device.supported_output_configs() {
        Ok(ranges) => ranges
            .map(|range| Candidate {
                channels: range.channels(),
                min_rate: range.min_sample_rate().0,
                max_rate: range.max_sample_rate().0,
                format: range.sample_format(),
            })
            .collect(),
        Err(e) => {
            warn!("Failed to query supported output configs: {e}");
            Vec::new()
        }
    };

    if let Some(format) = pick_format(&candidates, requested.sample_rate, requested.channels) {
        return Ok((requested.clone(), format));
    }

    let fallback = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;

    warn!(
        "Device does not support {} Hz with {} channel(s), using {} Hz with {} channel(s)",
        requested.sample_rate,
        requested.channels,
        fallback.sample_rate().0,
        fallback.channels()
    );

    let config = OutputConfig {
        sample_rate: fallback.sample_rate().0,
        channels: fallback.channels(),
        buffer_size: requested.buffer_size,
    };
    Ok((config, fallback.sample_format()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.buffer_size, None);
    }

    #[test]
    fn test_config_from_transport() {
        let transport = TransportConfig {
            consumer_rate: 48_000,
            channels: 2,
            quantum_frames: Some(64),
            ..TransportConfig::default()
        };
        let config = OutputConfig::from(&transport);
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.channels, 2);

        let stream_config = config.stream_config();
        assert_eq!(stream_config.sample_rate, SampleRate(48_000));
        assert_eq!(stream_config.buffer_size, BufferSize::Fixed(64));
    }

    fn candidate(channels: u16, min_rate: u32, max_rate: u32, format: SampleFormat) -> Candidate {
        Candidate {
            channels,
            min_rate,
            max_rate,
            format,
        }
    }

    #[test]
    fn test_pick_format_prefers_float() {
        let candidates = [
            candidate(1, 8_000, 96_000, SampleFormat::U16),
            candidate(1, 44_100, 44_100, SampleFormat::I16),
            candidate(2, 8_000, 48_000, SampleFormat::F32),
        ];

        assert_eq!(pick_format(&candidates, 44_100, 1), Some(SampleFormat::I16));
        assert_eq!(pick_format(&candidates, 48_000, 2), Some(SampleFormat::F32));
        assert_eq!(pick_format(&candidates, 96_000, 1), Some(SampleFormat::U16));
    }

    #[test]
    fn test_pick_format_rejects_unsupported() {
        let candidates = [
            candidate(2, 44_100, 48_000, SampleFormat::F32),
            candidate(1, 44_100, 48_000, SampleFormat::I8),
        ];

        // Rate out of range, channel mismatch, unusable format.
        assert_eq!(pick_format(&candidates, 192_000, 2), None);
        assert_eq!(pick_format(&candidates, 44_100, 6), None);
        assert_eq!(pick_format(&candidates, 44_100, 1), None);
        assert_eq!(pick_format(&[], 44_100, 1), None);
    }
}
