//! Producer-side interface to the emulation core.

use super::Sample;

/// Something that emits raw samples as emulation progresses.
///
/// Implemented by the emulation engine. Batches are variable-length and are
/// handed to the transport by value.
pub trait SampleSource {
    /// Append the samples produced since the last call to `out`.
    fn produce_samples(&mut self, out: &mut Vec<Sample>);

    /// Nominal samples per second, derived from the emulated clock.
    fn producer_rate(&self) -> f64;
}
