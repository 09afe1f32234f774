//! Filter a still image.

use std::path::PathBuf;

use anyhow::Context;
use framekit_common::config::FramekitConfig;
use framekit_render_engine::{FfmpegHost, MediaExporter};
use image::DynamicImage;

use crate::ProcessingArgs;

pub fn run(
    config: FramekitConfig,
    input: PathBuf,
    output: PathBuf,
    time: f64,
    processing: ProcessingArgs,
) -> anyhow::Result<()> {
    let source = ::image::open(&input)
        .with_context(|| format!("Failed to open image {}", input.display()))?;

    let host = FfmpegHost::from_config(&config.export);
    let mut exporter = MediaExporter::new(host, config);
    exporter.enable_processing(super::processing_config(&processing)?);

    println!("Processing image: {}", input.display());
    println!("  Filter: {}", processing.filter);
    println!("  Overlays: {}", processing.overlays.len());
    println!("  Background: {}", processing.background);

    let rendered = exporter.export_image(source, time)?;
    save(rendered, &output)?;

    println!("Saved: {}", output.display());
    Ok(())
}

fn save(image: DynamicImage, output: &std::path::Path) -> anyhow::Result<()> {
    let is_jpeg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    // JPEG has no alpha channel.
    let image = if is_jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    image
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))
}
