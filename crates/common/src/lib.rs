//! FrameKit Common Utilities
//!
//! Shared infrastructure for all FrameKit crates:
//! - Error taxonomy and result aliases
//! - Presentation clock and rate control for progress throttling
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
