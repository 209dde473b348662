//! Core domain types for soundbridge.

pub mod rate;
pub mod sample;
pub mod source;

pub use rate::RateRatio;
pub use sample::{Sample, SampleEncoding};
pub use source::SampleSource;
