//! Frame buffers and samples.
//!
//! A [`FrameBuffer`] is the unit of transformation: an owned RGBA8 surface
//! that moves from one pipeline stage to the next. A [`SampleBuffer`] pairs
//! a frame with the presentation time it belongs to.

use framekit_common::clock::PresentationTime;
use framekit_common::error::{ExportError, ExportResult};
use image::{DynamicImage, RgbaImage};

use crate::color::Color;

/// Width and height of a frame, the only format attribute the pipeline
/// negotiates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub width: u32,
    pub height: u32,
}

impl PixelFormat {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The same format with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Size in bytes of one RGBA8 frame in this format.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// An owned RGBA8 pixel surface with non-zero dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: RgbaImage,
}

impl FrameBuffer {
    /// Wrap an RGBA image. Returns `None` when either dimension is zero.
    pub fn new(pixels: RgbaImage) -> Option<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return None;
        }
        Some(Self { pixels })
    }

    /// A frame of the given size filled with one color.
    ///
    /// Zero dimensions are bumped to one pixel.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width.max(1), height.max(1), color.to_rgba()),
        }
    }

    /// Convert a decoded image into a frame buffer.
    pub fn from_image(image: &DynamicImage) -> ExportResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExportError::NoPixelBuffer);
        }
        Self::new(image.to_rgba8()).ok_or(ExportError::NoPixelBuffer)
    }

    /// Build a frame from tightly packed RGBA8 bytes.
    pub fn from_raw(format: PixelFormat, bytes: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(format.width, format.height, bytes).and_then(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::new(self.width(), self.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color::from(*self.pixels.get_pixel(x, y))
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.put_pixel(x, y, color.to_rgba());
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn into_dynamic_image(self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels)
    }
}

/// A frame stamped with its presentation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    frame: FrameBuffer,
    time: PresentationTime,
}

impl SampleBuffer {
    pub fn new(frame: FrameBuffer, time: PresentationTime) -> Self {
        Self { frame, time }
    }

    /// Wrap a frame at a time given in seconds.
    ///
    /// Fails with [`ExportError::NoSampleBuffer`] when the time is negative
    /// or not finite.
    pub fn at_secs(frame: FrameBuffer, secs: f64) -> ExportResult<Self> {
        let time = PresentationTime::from_secs(secs).ok_or(ExportError::NoSampleBuffer)?;
        Ok(Self::new(frame, time))
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn time(&self) -> PresentationTime {
        self.time
    }

    pub fn format(&self) -> PixelFormat {
        self.frame.format()
    }

    pub fn into_parts(self) -> (FrameBuffer, PresentationTime) {
        (self.frame, self.time)
    }
}
