//! 16-bit sample view over [`ByteRingBuffer`].
//!
//! All wraparound bookkeeping lives in the byte buffer. This type only
//! converts between sample and byte units.

use soundbridge_core::Sample;

use super::ByteRingBuffer;

const SAMPLE_BYTES: usize = std::mem::size_of::<Sample>();

/// Circular store of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct SampleRingBuffer {
    bytes: ByteRingBuffer,
}

impl SampleRingBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: ByteRingBuffer::new(capacity * SAMPLE_BYTES),
        }
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity() / SAMPLE_BYTES
    }

    /// Physical slot of the logical front, in samples.
    pub const fn start(&self) -> usize {
        self.bytes.start() / SAMPLE_BYTES
    }

    /// Number of buffered samples.
    pub const fn len(&self) -> usize {
        self.bytes.len() / SAMPLE_BYTES
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// The wrapped byte buffer.
    pub const fn bytes(&self) -> &ByteRingBuffer {
        &self.bytes
    }

    /// Append samples, overwriting the oldest on overflow.
    ///
    /// Returns the number of samples lost.
    pub fn push_back(&mut self, samples: &[Sample]) -> usize {
        self.bytes.push_back(bytemuck::cast_slice(samples)) / SAMPLE_BYTES
    }

    /// Drop up to `count` samples from the front. Returns how many were removed.
    pub fn remove_front(&mut self, count: usize) -> usize {
        self.bytes.remove_front(count * SAMPLE_BYTES) / SAMPLE_BYTES
    }

    /// Sample at logical index `index`.
    ///
    /// Reads through a sample-granular view of the byte storage, so a sample
    /// is always fetched from one aligned slot. The caller must keep
    /// `index < len()`.
    pub fn at(&self, index: usize) -> Sample {
        debug_assert!(
            index < self.len(),
            "index {index} outside logical window of {} samples",
            self.len()
        );
        debug_assert_eq!(self.bytes.start() % SAMPLE_BYTES, 0);

        let slot = (self.start() + index) % self.capacity();
        let offset = slot * SAMPLE_BYTES;
        let storage = self.bytes.storage();
        Sample::from_ne_bytes([storage[offset], storage[offset + 1]])
    }

    /// Iterate the logical window front to back.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).map(move |i| self.at(i))
    }

    /// Sample stored in physical slot `slot`, stale or not.
    #[cfg(test)]
    fn slot(&self, slot: usize) -> Sample {
        let storage = self.bytes.storage();
        Sample::from_ne_bytes([storage[slot * 2], storage[slot * 2 + 1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn slots(buffer: &SampleRingBuffer) -> Vec<Sample> {
        (0..buffer.capacity()).map(|i| buffer.slot(i)).collect()
    }

    #[test]
    fn test_overwrite_sequence() {
        let mut buffer = SampleRingBuffer::new(5);
        assert_eq!(buffer.bytes().capacity(), 10);

        buffer.push_back(&[1, 2, 3]);
        assert_eq!(buffer.start(), 0);
        assert_eq!(buffer.len(), 3);
        assert_eq!(slots(&buffer), vec![1, 2, 3, 0, 0]);
        assert_eq!(buffer.at(0), 1);
        assert_eq!(buffer.at(2), 3);

        buffer.push_back(&[4]);
        assert_eq!(buffer.len(), 4);
        assert_eq!(slots(&buffer), vec![1, 2, 3, 4, 0]);
        assert_eq!(buffer.at(3), 4);

        buffer.push_back(&[5]);
        assert_eq!(buffer.start(), 0);
        assert_eq!(buffer.len(), 5);
        assert_eq!(slots(&buffer), vec![1, 2, 3, 4, 5]);

        buffer.push_back(&[6]);
        assert_eq!(buffer.start(), 1);
        assert_eq!(slots(&buffer), vec![6, 2, 3, 4, 5]);
        assert_eq!(buffer.at(0), 2);
        assert_eq!(buffer.at(4), 6);

        buffer.push_back(&[7, 8]);
        assert_eq!(buffer.start(), 3);
        assert_eq!(slots(&buffer), vec![6, 7, 8, 4, 5]);
        assert_eq!(buffer.at(0), 4);
        assert_eq!(buffer.at(4), 8);

        buffer.push_back(&[9, 10, 11, 12, 13, 14]);
        assert_eq!(buffer.start(), 4);
        assert_eq!(buffer.len(), 5);
        assert_eq!(slots(&buffer), vec![11, 12, 13, 14, 10]);
        assert_eq!(buffer.at(0), 10);
        assert_eq!(buffer.at(4), 14);

        buffer.push_back(&[15, 16, 17, 18, 19, 20, 21, 22]);
        assert_eq!(buffer.start(), 2);
        assert_eq!(slots(&buffer), vec![21, 22, 18, 19, 20]);
        assert_eq!(buffer.at(0), 18);
        assert_eq!(buffer.at(4), 22);

        assert_eq!(buffer.remove_front(4), 4);
        assert_eq!(buffer.start(), 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.at(0), 22);

        assert_eq!(buffer.remove_front(2), 1);
        assert_eq!(buffer.start(), 2);
        assert_eq!(buffer.len(), 0);
        assert_eq!(slots(&buffer), vec![21, 22, 18, 19, 20]);
    }

    #[test]
    fn test_full_range_values_survive_wraparound() {
        let mut buffer = SampleRingBuffer::new(3);
        buffer.push_back(&[0xFFFF, 0x0102]);
        buffer.remove_front(1);
        buffer.push_back(&[0xABCD, 0x8000]);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![0x0102, 0xABCD, 0x8000]);
    }

    #[test]
    fn test_lost_samples_reported() {
        let mut buffer = SampleRingBuffer::new(4);
        assert_eq!(buffer.push_back(&[1, 2, 3]), 0);
        assert_eq!(buffer.push_back(&[4, 5, 6]), 2);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(Vec<Sample>),
        Remove(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop::collection::vec(any::<u16>(), 0..20).prop_map(Op::Push),
            (0usize..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_halves_byte_window(
            capacity in 1usize..10,
            ops in prop::collection::vec(op_strategy(), 0..40),
        ) {
            let mut buffer = SampleRingBuffer::new(capacity);
            let mut model: VecDeque<Sample> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Push(samples) => {
                        model.extend(samples.iter().copied());
                        let overflow = model.len().saturating_sub(capacity);
                        model.drain(..overflow);
                        prop_assert_eq!(buffer.push_back(&samples), overflow);
                    }
                    Op::Remove(count) => {
                        let removed = buffer.remove_front(count);
                        model.drain(..removed);
                    }
                }

                prop_assert_eq!(buffer.bytes().len(), buffer.len() * 2);
                prop_assert_eq!(buffer.bytes().start(), buffer.start() * 2);
                prop_assert_eq!(buffer.iter().collect::<Vec<_>>(), model.iter().copied().collect::<Vec<_>>());
            }
        }
    }
}
