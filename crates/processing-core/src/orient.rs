//! Orientation correction for decoded frames.

use framekit_media_model::frame::FrameBuffer;
use framekit_media_model::track::MediaTransform;
use image::imageops;

/// Apply a track's preferred transform to a decoded frame.
pub fn orient(frame: FrameBuffer, transform: MediaTransform) -> FrameBuffer {
    let rotated = match transform {
        MediaTransform::Identity => return frame,
        MediaTransform::Rotate90 => imageops::rotate90(frame.as_image()),
        MediaTransform::Rotate180 => imageops::rotate180(frame.as_image()),
        MediaTransform::Rotate270 => imageops::rotate270(frame.as_image()),
    };
    FrameBuffer::new(rotated).unwrap_or(frame)
}
