//! FrameKit Render Engine
//!
//! Renders still images and videos through the frame transform unit and
//! exports the result.
//!
//! # Pipeline Architecture
//!
//! ```text
//! image ──────────────────────────────────────┐
//!                                             ├── Renderer (prime → produce)
//! video ── Host (decode) ── Compositor ───────┘         │
//!            │                                          ├── Orientation
//!            │                                          ├── Background Fill
//!            │                                          ├── Filter
//!            │                                          ├── Overlays
//!            │                                          ▼
//!            └────────── Encode (H.264) ◄─────── processed frame
//!                             │
//!                             ▼
//!                        output.mov
//! ```

pub mod compositor;
pub mod context;
pub mod export;
pub mod ffmpeg;
pub mod host;
pub mod progress;
pub mod renderer;

pub use compositor::{
    CompositionRequest, CompositorFactory, FrameSequenceCompositor, FrameSequenceCompositorFactory,
    VideoCompositing,
};
pub use context::{CpuContext, ProcessingContext, TransformJob};
pub use export::{MediaExporter, ProcessingConfig};
pub use ffmpeg::FfmpegHost;
pub use host::{CompositionHost, ExportSession, SessionSettings, SessionStatus};
pub use progress::{ExportProgress, ExportStage, ProgressCallback, ProgressReporter};
pub use renderer::{Primed, Renderer};
