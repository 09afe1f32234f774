//! Processing contexts that execute frame transforms.

use framekit_media_model::color::Color;
use framekit_media_model::frame::FrameBuffer;
use framekit_media_model::overlay::OverlaySet;
use framekit_processing_core::filter::Filter;
use framekit_processing_core::transform::transform;

/// Everything a context needs to transform one frame.
pub struct TransformJob<'a> {
    pub filter: &'a dyn Filter,
    pub overlays: &'a OverlaySet,
    pub background: Color,
}

/// Execution backend for the frame transform unit.
///
/// Returns `None` when no output surface could be produced.
pub trait ProcessingContext: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    fn render(&self, frame: &FrameBuffer, job: &TransformJob<'_>) -> Option<FrameBuffer>;
}

/// Software context running the transform on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuContext;

impl ProcessingContext for CpuContext {
    fn name(&self) -> &str {
        "cpu"
    }

    fn render(&self, frame: &FrameBuffer, job: &TransformJob<'_>) -> Option<FrameBuffer> {
        Some(transform(frame, job.filter, job.overlays, job.background))
    }
}
