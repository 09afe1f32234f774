//! Frame transform unit.
//!
//! Turns one raw frame into its exported form:
//!
//! ```text
//! source ──► over background fill ──► filter ──► overlay[0] ──► … ──► overlay[n-1]
//! ```
//!
//! Overlays are drawn after the filter, so they are never filtered. The
//! transform is deterministic and never mutates its inputs.

use framekit_media_model::color::Color;
use framekit_media_model::frame::FrameBuffer;
use framekit_media_model::overlay::OverlaySet;
use image::imageops::{self, FilterType as ResizeFilter};
use image::{Rgba, RgbaImage};

use crate::filter::Filter;

/// Apply background fill, filter, and overlays to one frame.
pub fn transform(
    frame: &FrameBuffer,
    filter: &dyn Filter,
    overlays: &OverlaySet,
    background: Color,
) -> FrameBuffer {
    let based = fill_background(frame, background);
    let mut out = filter.apply(&based);
    for overlay in overlays.iter() {
        draw_overlay(&mut out, overlay);
    }
    out
}

/// Composite the frame over a solid background color.
///
/// Opaque source pixels are kept exactly, fully transparent ones become the
/// background exactly.
pub fn fill_background(frame: &FrameBuffer, background: Color) -> FrameBuffer {
    let bg = background.to_rgba();
    let mut out = frame.clone();
    for px in out.as_image_mut().pixels_mut() {
        *px = source_over(*px, bg);
    }
    out
}

/// Draw `overlay` over `target`, scaling the overlay to the target size.
pub fn draw_overlay(target: &mut FrameBuffer, overlay: &FrameBuffer) {
    let (w, h) = (target.width(), target.height());
    let scaled;
    let layer: &RgbaImage = if overlay.width() == w && overlay.height() == h {
        overlay.as_image()
    } else {
        scaled = imageops::resize(overlay.as_image(), w, h, ResizeFilter::Triangle);
        &scaled
    };

    for (dst, src) in target.as_image_mut().pixels_mut().zip(layer.pixels()) {
        *dst = source_over(*src, *dst);
    }
}

/// Porter-Duff source-over for straight-alpha RGBA8.
pub fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0;
    match sa {
        255 => return src,
        0 => return dst,
        _ => {}
    }

    let sa = sa as f32 / 255.0;
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(sr, dst.0[0]),
        channel(sg, dst.0[1]),
        channel(sb, dst.0[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{create_filter, PixelMap};
    use framekit_media_model::filter_type::FilterType;
    use proptest::prelude::*;

    /// 640x480 frame: opaque left half, fully transparent right half.
    fn half_transparent() -> FrameBuffer {
        let img = RgbaImage::from_fn(640, 480, |x, y| {
            if x < 320 {
                Rgba([(x % 256) as u8, (y % 256) as u8, 77, 255])
            } else {
                Rgba([12, 34, 56, 0])
            }
        });
        FrameBuffer::new(img).unwrap()
    }

    /// Overlay with an opaque square in the given color, transparent elsewhere.
    fn square(color: Color, size: u32, x0: u32, side: u32) -> FrameBuffer {
        let img = RgbaImage::from_fn(size, size, |x, y| {
            if (x0..x0 + side).contains(&x) && (x0..x0 + side).contains(&y) {
                color.to_rgba()
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        FrameBuffer::new(img).unwrap()
    }

    #[test]
    fn test_identity_over_black_only_fills_transparent_regions() {
        let frame = half_transparent();
        let identity = create_filter(FilterType::Passthrough);
        let out = transform(&frame, identity.as_ref(), &OverlaySet::empty(), Color::BLACK);

        assert_eq!(out.format(), frame.format());
        for y in (0..480).step_by(7) {
            for x in (0..640).step_by(5) {
                if x < 320 {
                    assert_eq!(out.pixel(x, y), frame.pixel(x, y));
                } else {
                    assert_eq!(out.pixel(x, y), Color::BLACK);
                }
            }
        }
    }

    #[test]
    fn test_transform_does_not_mutate_input() {
        let frame = half_transparent();
        let before = frame.clone();
        let overlays: OverlaySet = [square(Color::WHITE, 16, 0, 8)].into_iter().collect();
        let _ = transform(&frame, &PixelMap::invert(), &overlays, Color::BLACK);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_overlay_order_matters_when_overlapping() {
        let frame = FrameBuffer::filled(16, 16, Color::WHITE);
        let red = square(Color::rgb(255, 0, 0), 16, 2, 8);
        let blue = square(Color::rgb(0, 0, 255), 16, 6, 8);
        let identity = create_filter(FilterType::Passthrough);

        let ab: OverlaySet = [red.clone(), blue.clone()].into_iter().collect();
        let ba: OverlaySet = [blue, red].into_iter().collect();
        let out_ab = transform(&frame, identity.as_ref(), &ab, Color::CLEAR);
        let out_ba = transform(&frame, identity.as_ref(), &ba, Color::CLEAR);

        assert_ne!(out_ab, out_ba);
        // Overlap region shows whichever was drawn last.
        assert_eq!(out_ab.pixel(7, 7), Color::rgb(0, 0, 255));
        assert_eq!(out_ba.pixel(7, 7), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_overlays_are_not_filtered() {
        let frame = FrameBuffer::filled(8, 8, Color::BLACK);
        let overlays: OverlaySet = [square(Color::rgb(255, 0, 0), 8, 0, 4)].into_iter().collect();
        let out = transform(&frame, &PixelMap::invert(), &overlays, Color::CLEAR);

        assert_eq!(out.pixel(1, 1), Color::rgb(255, 0, 0));
        assert_eq!(out.pixel(6, 6), Color::WHITE);
    }

    #[test]
    fn test_overlay_is_scaled_to_frame() {
        let frame = FrameBuffer::filled(20, 10, Color::BLACK);
        let overlays: OverlaySet = [FrameBuffer::filled(2, 2, Color::WHITE)].into_iter().collect();
        let out = transform(
            &frame,
            create_filter(FilterType::Passthrough).as_ref(),
            &overlays,
            Color::CLEAR,
        );
        assert_eq!(out.format(), frame.format());
        assert_eq!(out.pixel(19, 9), Color::WHITE);
    }

    #[test]
    fn test_source_over_half_alpha() {
        let out = source_over(Rgba([255, 255, 255, 128]), Rgba([0, 0, 0, 255]));
        assert_eq!(out.0[3], 255);
        assert!((out.0[0] as i32 - 128).abs() <= 1);
    }

    proptest! {
        #[test]
        fn prop_transform_is_deterministic(
            r in 0u8..=255, g in 0u8..=255, b in 0u8..=255, a in 0u8..=255,
            bg_a in 0u8..=255,
        ) {
            let frame = FrameBuffer::filled(3, 2, Color::rgba(r, g, b, a));
            let background = Color::rgba(10, 20, 30, bg_a);
            let filter = PixelMap::sepia();
            let first = transform(&frame, &filter, &OverlaySet::empty(), background);
            let second = transform(&frame, &filter, &OverlaySet::empty(), background);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_opaque_background_yields_opaque_frame(a in 0u8..=255) {
            let frame = FrameBuffer::filled(2, 2, Color::rgba(90, 40, 200, a));
            let out = fill_background(&frame, Color::BLACK);
            prop_assert!(out.as_image().pixels().all(|px| px.0[3] == 255));
        }
    }
}
