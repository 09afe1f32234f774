//! FrameKit Media Model
//!
//! Defines the data contracts shared by the processing and export crates:
//! - **Frames:** Owned RGBA pixel surfaces and time-stamped samples
//! - **Processing:** Filter selection, overlay sets, background fill
//! - **Media:** Tracks, orientation, export presets, embedded metadata
//! - **Jobs:** Export job lifecycle states
//!
//! Frame buffers always have non-zero dimensions; constructing one from an
//! empty image fails instead of producing a degenerate surface.

pub mod color;
pub mod filter_type;
pub mod frame;
pub mod job;
pub mod media_info;
pub mod overlay;
pub mod preset;
pub mod track;

pub use color::*;
pub use filter_type::*;
pub use frame::*;
pub use job::*;
pub use media_info::*;
pub use overlay::*;
pub use preset::*;
pub use track::*;
