pub mod check;
pub mod filters;
pub mod image;
pub mod video;

use std::sync::Arc;

use anyhow::Context;
use framekit_media_model::frame::FrameBuffer;
use framekit_media_model::overlay::OverlaySet;
use framekit_render_engine::ProcessingConfig;

use crate::ProcessingArgs;

/// Load overlay images and build the processing configuration.
fn processing_config(args: &ProcessingArgs) -> anyhow::Result<ProcessingConfig> {
    let mut layers = Vec::with_capacity(args.overlays.len());
    for path in &args.overlays {
        let image = ::image::open(path)
            .with_context(|| format!("Failed to load overlay {}", path.display()))?;
        let frame = FrameBuffer::from_image(&image)
            .with_context(|| format!("Overlay {} has no pixels", path.display()))?;
        layers.push(Arc::new(frame));
    }

    Ok(ProcessingConfig {
        filter_type: args.filter,
        overlays: OverlaySet::new(layers),
        background_fill: args.background,
    })
}
