//! FrameKit Processing Core: the frame transform unit
//!
//! Pure per-frame pixel work:
//! - **Filters:** Pluggable transforms selected by `FilterType`
//! - **Transform:** Background fill, filter, then overlays in painter's order
//! - **Orientation:** Quarter-turn correction from track transforms
//!
//! This crate is pure computation: no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod filter;
pub mod orient;
pub mod transform;

pub use filter::{create_filter, Filter};
pub use orient::orient;
pub use transform::transform;
