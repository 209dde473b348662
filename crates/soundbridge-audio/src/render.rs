//! Per-quantum drain and nearest-neighbor resample.
//!
//! Runs inside the device callback. Nothing here blocks, allocates, or fails:
//! an empty buffer renders silence and a short buffer is stretched over the
//! whole quantum.

use soundbridge_core::{RateRatio, SampleEncoding};

use crate::bridge::{BatchReceiver, DemandSender};
use crate::buffer::SampleRingBuffer;
use crate::diagnostics::SharedDiagnostics;

/// Result of rendering one quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The buffer was empty; the quantum is silence.
    Underrun,
    Rendered {
        /// Samples removed from the front of the buffer.
        consumed: usize,
        /// Fewer samples were buffered than the rate ratio asks for.
        stretched: bool,
    },
}

/// Maps buffered producer samples onto device frames.
#[derive(Debug, Clone)]
pub struct AudioRenderer {
    rate: RateRatio,
    encoding: SampleEncoding,
    diagnostics: SharedDiagnostics,
}

impl AudioRenderer {
    pub const fn new(rate: RateRatio, encoding: SampleEncoding, diagnostics: SharedDiagnostics) -> Self {
        Self {
            rate,
            encoding,
            diagnostics,
        }
    }

    pub const fn rate(&self) -> RateRatio {
        self.rate
    }

    /// Use a different device rate, keeping the producer rate.
    pub fn set_consumer_rate(&mut self, consumer_rate: u32) {
        self.rate = RateRatio::new(self.rate.producer_rate, consumer_rate);
    }

    /// Render `frames` output frames, handing each amplitude to `write`.
    ///
    /// Frame `i` takes the sample at `floor(i * n_in / frames)`, where `n_in`
    /// is the number of buffered samples covering this quantum at the current
    /// rate ratio. Samples skipped by that mapping are discarded along with
    /// the rest of the `n_in` window.
    pub fn render_with(
        &self,
        buffer: &mut SampleRingBuffer,
        frames: usize,
        mut write: impl FnMut(usize, f32),
    ) -> RenderOutcome {
        if frames == 0 {
            return RenderOutcome::Rendered {
                consumed: 0,
                stretched: false,
            };
        }

        if buffer.is_empty() {
            for i in 0..frames {
                write(i, 0.0);
            }
            self.diagnostics.record_underrun();
            return RenderOutcome::Underrun;
        }

        let wanted = self.rate.input_samples_for(frames);
        let n_in = buffer.len().min(wanted);

        for i in 0..frames {
            let index = (i as u64 * n_in as u64 / frames as u64) as usize;
            write(i, self.encoding.normalize(buffer.at(index)));
        }

        let consumed = buffer.remove_front(n_in);
        let stretched = n_in < wanted;
        self.diagnostics.record_quantum(consumed, stretched);

        RenderOutcome::Rendered {
            consumed,
            stretched,
        }
    }

    /// Render into a mono block.
    pub fn render(&self, buffer: &mut SampleRingBuffer, out: &mut [f32]) -> RenderOutcome {
        let frames = out.len();
        self.render_with(buffer, frames, |i, amplitude| out[i] = amplitude)
    }
}

/// Everything the device callback owns.
///
/// Pending batches are applied at the top of [`RenderContext::process_with`],
/// so no batch ever lands while a quantum is being drained.
#[derive(Debug)]
pub struct RenderContext {
    buffer: SampleRingBuffer,
    receiver: BatchReceiver,
    renderer: AudioRenderer,
    demand: Option<DemandSender>,
}

impl RenderContext {
    pub const fn new(buffer: SampleRingBuffer, receiver: BatchReceiver, renderer: AudioRenderer) -> Self {
        Self {
            buffer,
            receiver,
            renderer,
            demand: None,
        }
    }

    /// Report rendered frames to a pacing producer.
    #[must_use]
    pub fn with_demand(mut self, demand: DemandSender) -> Self {
        self.demand = Some(demand);
        self
    }

    pub const fn buffer(&self) -> &SampleRingBuffer {
        &self.buffer
    }

    /// Retune to the rate the device actually granted.
    pub fn set_consumer_rate(&mut self, consumer_rate: u32) {
        self.renderer.set_consumer_rate(consumer_rate);
    }

    /// Apply pending batches, then render one quantum of `frames` frames.
    pub fn process_with(&mut self, frames: usize, write: impl FnMut(usize, f32)) -> RenderOutcome {
        self.receiver.drain_into(&mut self.buffer);
        let outcome = self.renderer.render_with(&mut self.buffer, frames, write);
        if let Some(demand) = &mut self.demand {
            demand.notify(frames);
        }
        outcome
    }

    /// Process a mono block.
    pub fn process(&mut self, out: &mut [f32]) -> RenderOutcome {
        let frames = out.len();
        self.process_with(frames, |i, amplitude| out[i] = amplitude)
    }

    /// Process an interleaved block, copying the mono signal to every channel.
    ///
    /// Trailing samples that do not form a whole frame are set to silence.
    pub fn process_interleaved<T: Copy>(
        &mut self,
        out: &mut [T],
        channels: usize,
        convert: impl Fn(f32) -> T,
    ) -> RenderOutcome {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let whole = frames * channels;

        let (body, tail) = out.split_at_mut(whole);
        tail.fill(convert(0.0));

        self.process_with(frames, |i, amplitude| {
            body[i * channels..(i + 1) * channels].fill(convert(amplitude));
        })
    }
}
