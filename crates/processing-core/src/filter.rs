//! Pluggable per-frame filters.
//!
//! A filter is selected by [`FilterType`] and turns one frame into another.
//! The filters here are reference implementations that keep the pipeline
//! usable end to end; richer effects plug in through the same trait.

use framekit_media_model::filter_type::FilterType;
use framekit_media_model::frame::{FrameBuffer, PixelFormat};
use image::{Rgba, RgbaImage};

/// A per-frame transform selected by identifier.
pub trait Filter: Send + Sync {
    /// Identifier this filter is registered under.
    fn filter_type(&self) -> FilterType;

    /// Cache any state that depends on the frame size.
    ///
    /// Called when a renderer primes for a new format. Filters without
    /// size-dependent state keep the default no-op.
    fn prepare(&mut self, _format: PixelFormat) {}

    /// Produce the filtered frame. Must not depend on previous calls.
    fn apply(&self, frame: &FrameBuffer) -> FrameBuffer;
}

/// Build the filter registered for an identifier.
pub fn create_filter(filter_type: FilterType) -> Box<dyn Filter> {
    tracing::debug!(filter = %filter_type, "Creating filter");
    match filter_type {
        FilterType::Passthrough => Box::new(Passthrough),
        FilterType::Grayscale => Box::new(PixelMap::grayscale()),
        FilterType::Invert => Box::new(PixelMap::invert()),
        FilterType::Sepia => Box::new(PixelMap::sepia()),
        FilterType::MirrorTwo => Box::new(MirrorTwo),
        FilterType::Chroma => Box::new(Chroma::default()),
    }
}

/// Identity filter.
pub struct Passthrough;

impl Filter for Passthrough {
    fn filter_type(&self) -> FilterType {
        FilterType::Passthrough
    }

    fn apply(&self, frame: &FrameBuffer) -> FrameBuffer {
        frame.clone()
    }
}

/// Filter that maps every pixel independently. Alpha is preserved.
pub struct PixelMap {
    filter_type: FilterType,
    map: fn([u8; 3]) -> [u8; 3],
}

impl PixelMap {
    pub fn grayscale() -> Self {
        Self {
            filter_type: FilterType::Grayscale,
            map: |[r, g, b]| {
                let luma = luma(r, g, b);
                [luma, luma, luma]
            },
        }
    }

    pub fn invert() -> Self {
        Self {
            filter_type: FilterType::Invert,
            map: |[r, g, b]| [255 - r, 255 - g, 255 - b],
        }
    }

    pub fn sepia() -> Self {
        Self {
            filter_type: FilterType::Sepia,
            map: |[r, g, b]| {
                let (r, g, b) = (r as f32, g as f32, b as f32);
                [
                    to_channel(0.393 * r + 0.769 * g + 0.189 * b),
                    to_channel(0.349 * r + 0.686 * g + 0.168 * b),
                    to_channel(0.272 * r + 0.534 * g + 0.131 * b),
                ]
            },
        }
    }
}

impl Filter for PixelMap {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn apply(&self, frame: &FrameBuffer) -> FrameBuffer {
        let mut out = frame.clone();
        for px in out.as_image_mut().pixels_mut() {
            let [r, g, b, a] = px.0;
            let [r, g, b] = (self.map)([r, g, b]);
            *px = Rgba([r, g, b, a]);
        }
        out
    }
}

/// Mirrors the left half of the frame onto the right half.
pub struct MirrorTwo;

impl Filter for MirrorTwo {
    fn filter_type(&self) -> FilterType {
        FilterType::MirrorTwo
    }

    fn apply(&self, frame: &FrameBuffer) -> FrameBuffer {
        let src = frame.as_image();
        let (w, h) = src.dimensions();
        let out = RgbaImage::from_fn(w, h, |x, y| {
            if x < w.div_ceil(2) {
                *src.get_pixel(x, y)
            } else {
                *src.get_pixel(w - 1 - x, y)
            }
        });
        FrameBuffer::new(out).unwrap_or_else(|| frame.clone())
    }
}

/// Shifts the red channel left and the blue channel right.
#[derive(Default)]
pub struct Chroma {
    /// Offset in pixels, cached by `prepare`.
    offset: Option<u32>,
}

impl Chroma {
    fn offset_for(width: u32) -> u32 {
        (width / 100).max(1)
    }
}

impl Filter for Chroma {
    fn filter_type(&self) -> FilterType {
        FilterType::Chroma
    }

    fn prepare(&mut self, format: PixelFormat) {
        self.offset = Some(Self::offset_for(format.width));
    }

    fn apply(&self, frame: &FrameBuffer) -> FrameBuffer {
        let src = frame.as_image();
        let (w, h) = src.dimensions();
        let offset = self.offset.unwrap_or_else(|| Self::offset_for(w));
        let out = RgbaImage::from_fn(w, h, |x, y| {
            let here = src.get_pixel(x, y).0;
            let red = src.get_pixel((x + offset).min(w - 1), y).0[0];
            let blue = src.get_pixel(x.saturating_sub(offset), y).0[2];
            Rgba([red, here[1], blue, here[3]])
        });
        FrameBuffer::new(out).unwrap_or_else(|| frame.clone())
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    to_channel(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use framekit_media_model::color::Color;

    fn gradient(width: u32, height: u32) -> FrameBuffer {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 20) as u8, (y * 30) as u8, 100, 255])
        });
        FrameBuffer::new(img).unwrap()
    }

    #[test]
    fn test_registry_returns_matching_filter() {
        for filter_type in FilterType::ALL {
            assert_eq!(create_filter(filter_type).filter_type(), filter_type);
        }
    }

    #[test]
    fn test_passthrough_is_identity() {
        let frame = gradient(5, 4);
        assert_eq!(Passthrough.apply(&frame), frame);
    }

    #[test]
    fn test_grayscale_equalizes_channels_and_keeps_alpha() {
        let mut frame = FrameBuffer::filled(2, 1, Color::rgb(200, 40, 10));
        frame.put_pixel(1, 0, Color::rgba(10, 200, 40, 128));
        let out = PixelMap::grayscale().apply(&frame);
        let px = out.pixel(1, 0);
        assert_eq!(px.r, px.g);
        assert_eq!(px.g, px.b);
        assert_eq!(px.a, 128);
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let frame = gradient(6, 3);
        let invert = PixelMap::invert();
        assert_eq!(invert.apply(&invert.apply(&frame)), frame);
    }

    #[test]
    fn test_sepia_saturates() {
        let frame = FrameBuffer::filled(1, 1, Color::WHITE);
        let out = PixelMap::sepia().apply(&frame);
        assert_eq!(out.pixel(0, 0).r, 255);
        assert!(out.pixel(0, 0).b < 255);
    }

    #[test]
    fn test_mirror_two_reflects_left_half() {
        let frame = gradient(4, 1);
        let out = MirrorTwo.apply(&frame);
        assert_eq!(out.pixel(3, 0), frame.pixel(0, 0));
        assert_eq!(out.pixel(2, 0), frame.pixel(1, 0));
        assert_eq!(out.pixel(1, 0), frame.pixel(1, 0));
    }

    #[test]
    fn test_chroma_prepare_matches_lazy_offset() {
        let frame = gradient(12, 2);
        let mut prepared = Chroma::default();
        prepared.prepare(frame.format());
        assert_eq!(prepared.apply(&frame), Chroma::default().apply(&frame));
        assert_ne!(prepared.apply(&frame), frame);
    }
}
