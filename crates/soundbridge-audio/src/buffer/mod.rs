//! Circular buffers owned by the audio callback.

pub mod ring;
pub mod sample;

pub use ring::ByteRingBuffer;
pub use sample::SampleRingBuffer;
