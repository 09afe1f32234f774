//! Frame renderer with an explicit prime/produce protocol.
//!
//! The transform pipeline was built for continuous streams: it needs a
//! warm-up pass for a given input format before its output is valid. The
//! renderer makes that visible in the types. [`Renderer::prime`] performs
//! the warm-up and is the only way to get a [`Primed`] handle, and only the
//! handle can [`Primed::produce`] a frame. A still image is therefore
//! primed and then produced with the same sample; a video stream primes
//! once and produces every frame after that.

use std::sync::Arc;

use framekit_common::error::{ExportError, ExportResult};
use framekit_media_model::color::Color;
use framekit_media_model::filter_type::FilterType;
use framekit_media_model::frame::{PixelFormat, SampleBuffer};
use framekit_media_model::overlay::OverlaySet;
use framekit_media_model::track::MediaTransform;
use framekit_processing_core::filter::{create_filter, Filter};
use framekit_processing_core::orient::orient;

use crate::context::{ProcessingContext, TransformJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PrimedFormat {
    input: PixelFormat,
    output: PixelFormat,
}

/// Renders samples through the frame transform unit on a processing context.
pub struct Renderer {
    context: Arc<dyn ProcessingContext>,
    filter_type: FilterType,
    overlays: OverlaySet,
    background_fill: Color,
    media_transform: MediaTransform,
    switch_input_dimensions: bool,
    filter: Box<dyn Filter>,
    primed: Option<PrimedFormat>,
}

impl Renderer {
    /// Bind a renderer to a processing context.
    pub fn new(context: Arc<dyn ProcessingContext>) -> Self {
        let filter_type = FilterType::default();
        Self {
            context,
            filter_type,
            overlays: OverlaySet::empty(),
            background_fill: Color::CLEAR,
            media_transform: MediaTransform::Identity,
            switch_input_dimensions: false,
            filter: create_filter(filter_type),
            primed: None,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Select a filter. Takes effect on [`Renderer::refresh_filter`].
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    /// Replace the overlays. Call [`Renderer::refresh_filter`] before the
    /// next submission.
    pub fn set_overlays(&mut self, overlays: OverlaySet) {
        self.overlays = overlays;
    }

    pub fn background_fill(&self) -> Color {
        self.background_fill
    }

    pub fn set_background_fill(&mut self, color: Color) {
        self.background_fill = color;
    }

    pub fn media_transform(&self) -> MediaTransform {
        self.media_transform
    }

    /// Transform applied to every source frame before filtering.
    pub fn set_media_transform(&mut self, transform: MediaTransform) {
        if self.media_transform != transform {
            self.media_transform = transform;
            self.primed = None;
        }
    }

    pub fn switch_input_dimensions(&self) -> bool {
        self.switch_input_dimensions
    }

    /// Whether output frames swap the source width and height.
    pub fn set_switch_input_dimensions(&mut self, switch: bool) {
        if self.switch_input_dimensions != switch {
            self.switch_input_dimensions = switch;
            self.primed = None;
        }
    }

    /// Rebuild the filter from the current selection.
    ///
    /// Must run after changing the filter or overlays. The renderer has to
    /// be primed again afterwards.
    pub fn refresh_filter(&mut self) {
        self.filter = create_filter(self.filter_type);
        self.primed = None;
        tracing::debug!(
            filter = %self.filter_type,
            overlays = self.overlays.len(),
            background = %self.background_fill,
            "Renderer filter refreshed"
        );
    }

    pub fn is_primed_for(&self, format: PixelFormat) -> bool {
        self.primed.is_some_and(|primed| primed.input == format)
    }

    /// Output format of the primed pipeline, if primed.
    pub fn output_format(&self) -> Option<PixelFormat> {
        self.primed.map(|primed| primed.output)
    }

    /// Warm the pipeline up for the sample's format.
    ///
    /// Produces nothing; the returned handle produces frames.
    pub fn prime(&mut self, sample: &SampleBuffer) -> Primed<'_> {
        let input = sample.format();
        let output = if self.switch_input_dimensions {
            input.swapped()
        } else {
            input
        };
        self.filter.prepare(output);
        self.primed = Some(PrimedFormat { input, output });
        tracing::debug!(
            context = self.context.name(),
            input_width = input.width,
            input_height = input.height,
            output_width = output.width,
            output_height = output.height,
            "Renderer primed"
        );
        Primed { renderer: self }
    }

    /// The primed handle, if already primed for the sample's format.
    pub fn primed(&mut self, sample: &SampleBuffer) -> Option<Primed<'_>> {
        if self.is_primed_for(sample.format()) {
            Some(Primed { renderer: self })
        } else {
            None
        }
    }
}

/// A renderer that has been primed and can produce output.
pub struct Primed<'a> {
    renderer: &'a mut Renderer,
}

impl Primed<'_> {
    pub fn output_format(&self) -> Option<PixelFormat> {
        self.renderer.output_format()
    }

    /// Render one sample and hand the result to `on_output`.
    ///
    /// `on_output` is only called with a valid frame. When nothing can be
    /// produced the call fails with [`ExportError::NoProcessedImage`] and
    /// `on_output` is dropped unused.
    pub fn produce<F>(&mut self, sample: SampleBuffer, on_output: F) -> ExportResult<()>
    where
        F: FnOnce(SampleBuffer),
    {
        let renderer = &mut *self.renderer;
        let Some(primed) = renderer.primed else {
            return Err(ExportError::NoProcessedImage);
        };
        if sample.format() != primed.input {
            tracing::warn!(
                expected_width = primed.input.width,
                expected_height = primed.input.height,
                width = sample.format().width,
                height = sample.format().height,
                "Sample does not match primed format"
            );
            return Err(ExportError::NoProcessedImage);
        }

        let (frame, time) = sample.into_parts();
        let oriented = orient(frame, renderer.media_transform);
        if oriented.format() != primed.output {
            tracing::warn!(
                transform = ?renderer.media_transform,
                switch_input_dimensions = renderer.switch_input_dimensions,
                "Oriented frame does not match primed output format"
            );
            return Err(ExportError::NoProcessedImage);
        }

        let job = TransformJob {
            filter: renderer.filter.as_ref(),
            overlays: &renderer.overlays,
            background: renderer.background_fill,
        };
        let rendered = renderer
            .context
            .render(&oriented, &job)
            .ok_or(ExportError::NoProcessedImage)?;

        on_output(SampleBuffer::new(rendered, time));
        Ok(())
    }
}
