//! # soundbridge-core
//!
//! Core types, configuration, and error handling for the soundbridge audio transport.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Pacing, TransportConfig};
pub use error::{Error, Result};
pub use types::*;
