//! # soundbridge-audio
//!
//! Audio transport from an emulated sound chip to a real-time output device.
//!
//! Features:
//! - Overwrite-on-overflow ring buffer owned by the device callback
//! - Non-blocking producer bridge with drop accounting
//! - Nearest-neighbor rate adaptation per output quantum
//! - Low-latency cpal output and optional WAV capture

pub mod bridge;
pub mod buffer;
pub mod capture;
pub mod diagnostics;
pub mod output;
pub mod render;
pub mod session;

pub use bridge::{producer_bridge, BatchReceiver, BatchSender, Demand, DemandReceiver};
pub use buffer::{ByteRingBuffer, SampleRingBuffer};
pub use capture::WavRecorder;
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot, SharedDiagnostics};
pub use render::{AudioRenderer, RenderContext, RenderOutcome};
pub use session::{AudioSession, SessionState};
