//! Frame-sequence compositor: the per-frame callback a host composition
//! pipeline invokes while exporting a video.
//!
//! The host owns the compositor. It builds one through a
//! [`CompositorFactory`], hands it a [`CompositionRequest`] per output
//! frame, and waits for the request to be finished. The exporter reaches
//! the installed instance afterwards to configure it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use framekit_common::clock::PresentationTime;
use framekit_common::error::{ExportError, ExportResult};
use framekit_media_model::color::Color;
use framekit_media_model::filter_type::FilterType;
use framekit_media_model::frame::{PixelFormat, SampleBuffer};
use framekit_media_model::overlay::OverlaySet;
use framekit_media_model::track::{MediaTransform, TrackId};
use tokio::sync::oneshot;

use crate::context::ProcessingContext;
use crate::renderer::Renderer;

/// Receiving end of a composition request.
pub type CompositionResponse = oneshot::Receiver<ExportResult<SampleBuffer>>;

/// One output frame the host wants composed.
pub struct CompositionRequest {
    composition_time: PresentationTime,
    source_track_ids: Vec<TrackId>,
    sources: HashMap<TrackId, SampleBuffer>,
    responder: oneshot::Sender<ExportResult<SampleBuffer>>,
}

impl CompositionRequest {
    /// Build a request from source samples in track order.
    pub fn new(
        composition_time: PresentationTime,
        sources: Vec<(TrackId, SampleBuffer)>,
    ) -> (Self, CompositionResponse) {
        let (responder, response) = oneshot::channel();
        let source_track_ids = sources.iter().map(|(id, _)| *id).collect();
        let request = Self {
            composition_time,
            source_track_ids,
            sources: sources.into_iter().collect(),
            responder,
        };
        (request, response)
    }

    pub fn composition_time(&self) -> PresentationTime {
        self.composition_time
    }

    pub fn source_track_ids(&self) -> &[TrackId] {
        &self.source_track_ids
    }

    /// Take the source sample for a track out of the request.
    pub fn take_source_frame(&mut self, track: TrackId) -> Option<SampleBuffer> {
        self.sources.remove(&track)
    }

    pub fn finish(self, sample: SampleBuffer) {
        self.respond(Ok(sample));
    }

    pub fn finish_with_error(self, err: ExportError) {
        self.respond(Err(err));
    }

    fn respond(self, result: ExportResult<SampleBuffer>) {
        if self.responder.send(result).is_err() {
            tracing::debug!(
                time = %self.composition_time,
                "Composition result dropped; host stopped waiting"
            );
        }
    }
}

/// Per-frame compositing capability a host invokes during export.
pub trait VideoCompositing: Send + Any {
    /// Output format the host will request from now on.
    fn render_context_changed(&mut self, _format: PixelFormat) {}

    /// Compose one frame. The request must be finished exactly once.
    fn start_request(&mut self, request: CompositionRequest);

    /// Abandon outstanding requests.
    fn cancel_all_pending(&mut self) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Builds the compositor a host installs into its export session.
pub trait CompositorFactory: Send + Sync {
    fn create(&self) -> Box<dyn VideoCompositing>;
}

/// Compositor that runs every frame through a [`Renderer`].
pub struct FrameSequenceCompositor {
    renderer: Renderer,
    frames_composed: u64,
}

impl FrameSequenceCompositor {
    pub fn new(context: Arc<dyn ProcessingContext>) -> Self {
        Self {
            renderer: Renderer::new(context),
            frames_composed: 0,
        }
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.renderer.set_filter_type(filter_type);
    }

    pub fn set_overlays(&mut self, overlays: OverlaySet) {
        self.renderer.set_overlays(overlays);
    }

    pub fn set_background_fill(&mut self, color: Color) {
        self.renderer.set_background_fill(color);
    }

    pub fn set_media_transform(&mut self, transform: MediaTransform) {
        self.renderer.set_media_transform(transform);
    }

    pub fn set_switch_input_dimensions(&mut self, switch: bool) {
        self.renderer.set_switch_input_dimensions(switch);
    }

    /// Apply filter and overlay changes. Call after configuring.
    pub fn refresh_filter(&mut self) {
        self.renderer.refresh_filter();
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn frames_composed(&self) -> u64 {
        self.frames_composed
    }

    fn compose(&mut self, request: &mut CompositionRequest) -> ExportResult<SampleBuffer> {
        let track = request
            .source_track_ids()
            .first()
            .copied()
            .ok_or(ExportError::NoVideoTrack)?;
        let source = request
            .take_source_frame(track)
            .ok_or(ExportError::NoVideoTrack)?;

        let (frame, _) = source.into_parts();
        let sample = SampleBuffer::new(frame, request.composition_time());

        let primed = if self.renderer.is_primed_for(sample.format()) {
            self.renderer.primed(&sample)
        } else {
            Some(self.renderer.prime(&sample))
        };
        let mut primed = primed.ok_or(ExportError::NoProcessedImage)?;

        let mut output = None;
        primed.produce(sample, |rendered| output = Some(rendered))?;
        output.ok_or(ExportError::NoProcessedImage)
    }
}

impl VideoCompositing for FrameSequenceCompositor {
    fn render_context_changed(&mut self, format: PixelFormat) {
        tracing::debug!(
            width = format.width,
            height = format.height,
            "Compositor render context changed"
        );
    }

    fn start_request(&mut self, mut request: CompositionRequest) {
        match self.compose(&mut request) {
            Ok(sample) => {
                self.frames_composed += 1;
                request.finish(sample);
            }
            Err(err) => {
                tracing::warn!(
                    time = %request.composition_time(),
                    error = %err,
                    "Frame composition failed"
                );
                request.finish_with_error(err);
            }
        }
    }

    fn cancel_all_pending(&mut self) {
        // Requests finish synchronously, so nothing is ever pending.
        tracing::debug!(
            frames_composed = self.frames_composed,
            "Compositor cancel requested"
        );
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Factory producing [`FrameSequenceCompositor`]s bound to one context.
#[derive(Clone)]
pub struct FrameSequenceCompositorFactory {
    context: Arc<dyn ProcessingContext>,
}

impl FrameSequenceCompositorFactory {
    pub fn new(context: Arc<dyn ProcessingContext>) -> Self {
        Self { context }
    }
}

impl CompositorFactory for FrameSequenceCompositorFactory {
    fn create(&self) -> Box<dyn VideoCompositing> {
        Box::new(FrameSequenceCompositor::new(self.context.clone()))
    }
}

/// Downcast an installed compositor to a [`FrameSequenceCompositor`].
pub fn as_frame_sequence(
    compositor: &mut dyn VideoCompositing,
) -> Option<&mut FrameSequenceCompositor> {
    compositor.as_any_mut().downcast_mut::<FrameSequenceCompositor>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CpuContext;
    use framekit_media_model::frame::FrameBuffer;

    fn frame(width: u32, height: u32, color: Color) -> SampleBuffer {
        SampleBuffer::new(
            FrameBuffer::filled(width, height, color),
            PresentationTime::ZERO,
        )
    }

    fn compositor() -> FrameSequenceCompositor {
        let mut compositor = FrameSequenceCompositor::new(Arc::new(CpuContext));
        compositor.set_filter_type(FilterType::Invert);
        compositor.set_background_fill(Color::BLACK);
        compositor.refresh_filter();
        compositor
    }

    #[test]
    fn test_request_is_rendered_at_composition_time() {
        let mut compositor = compositor();
        let time = PresentationTime::from_nanos(1_000_000_000);
        let (request, mut response) =
            CompositionRequest::new(time, vec![(TrackId(1), frame(4, 2, Color::WHITE))]);

        compositor.start_request(request);
        let out = response.try_recv().unwrap().unwrap();
        assert_eq!(out.time(), time);
        assert_eq!(out.frame().pixel(0, 0), Color::rgb(0, 0, 0));
        assert_eq!(compositor.frames_composed(), 1);
    }

    #[test]
    fn test_first_track_is_used() {
        let mut compositor = compositor();
        let (request, mut response) = CompositionRequest::new(
            PresentationTime::ZERO,
            vec![
                (TrackId(7), frame(2, 2, Color::WHITE)),
                (TrackId(3), frame(2, 2, Color::BLACK)),
            ],
        );
        compositor.start_request(request);
        let out = response.try_recv().unwrap().unwrap();
        assert_eq!(out.frame().pixel(1, 1), Color::rgb(0, 0, 0));
    }

    #[test]
    fn test_empty_request_reports_no_video_track() {
        let mut compositor = compositor();
        let (request, mut response) = CompositionRequest::new(PresentationTime::ZERO, Vec::new());
        compositor.start_request(request);
        assert!(matches!(
            response.try_recv().unwrap(),
            Err(ExportError::NoVideoTrack)
        ));
        assert_eq!(compositor.frames_composed(), 0);
    }

    #[test]
    fn test_malformed_request_reports_no_video_track() {
        let mut compositor = compositor();
        let (mut request, mut response) = CompositionRequest::new(
            PresentationTime::ZERO,
            vec![(TrackId(1), frame(2, 2, Color::WHITE))],
        );
        let _ = request.take_source_frame(TrackId(1));
        compositor.start_request(request);
        assert!(matches!(
            response.try_recv().unwrap(),
            Err(ExportError::NoVideoTrack)
        ));
    }

    #[test]
    fn test_format_change_primes_again() {
        let mut compositor = compositor();
        for (w, h) in [(4, 4), (4, 4), (8, 2)] {
            let (request, mut response) =
                CompositionRequest::new(PresentationTime::ZERO, vec![(TrackId(1), frame(w, h, Color::WHITE))]);
            compositor.start_request(request);
            let out = response.try_recv().unwrap().unwrap();
            assert_eq!(out.format(), PixelFormat::new(w, h));
        }
        assert_eq!(compositor.frames_composed(), 3);
    }

    #[test]
    fn test_factory_output_downcasts() {
        let factory = FrameSequenceCompositorFactory::new(Arc::new(CpuContext));
        let mut installed = factory.create();
        assert!(as_frame_sequence(installed.as_mut()).is_some());
    }

    struct ForeignCompositor;

    impl VideoCompositing for ForeignCompositor {
        fn start_request(&mut self, request: CompositionRequest) {
            request.finish_with_error(ExportError::NoProcessedImage);
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_foreign_compositor_does_not_downcast() {
        let mut foreign: Box<dyn VideoCompositing> = Box::new(ForeignCompositor);
        assert!(as_frame_sequence(foreign.as_mut()).is_none());
    }
}
