//! Source assets, tracks, and orientation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::frame::PixelFormat;

/// Identifier of a track within a source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Media type carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

/// Geometric transform the player applies to decoded frames.
///
/// Rotations are clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaTransform {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl MediaTransform {
    /// Map a rotation in degrees to the nearest quarter turn.
    ///
    /// Negative values are counter-clockwise, as written by some
    /// containers in their display matrix.
    pub fn from_rotation_degrees(degrees: i32) -> Self {
        let quarter = ((degrees as f64 / 90.0).round() as i64).rem_euclid(4);
        match quarter {
            1 => Self::Rotate90,
            2 => Self::Rotate180,
            3 => Self::Rotate270,
            _ => Self::Identity,
        }
    }

    /// Whether the transform exchanges width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }
}

/// Orientation a video track was recorded in, relative to its coded frames.
///
/// `Portrait` means coded frames are stored sideways and a quarter turn is
/// needed to display them, so width and height swap on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn is_portrait(&self) -> bool {
        matches!(self, Self::Portrait)
    }
}

/// Description of one track in a source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: TrackId,

    pub kind: TrackKind,

    /// Coded width in pixels (video only).
    #[serde(default)]
    pub width: u32,

    /// Coded height in pixels (video only).
    #[serde(default)]
    pub height: u32,

    /// Nominal frame rate (video only).
    #[serde(default)]
    pub fps: f64,

    /// Display rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation_degrees: i32,
}

impl TrackInfo {
    pub fn video(id: u32, width: u32, height: u32, fps: f64) -> Self {
        Self {
            id: TrackId(id),
            kind: TrackKind::Video,
            width,
            height,
            fps,
            rotation_degrees: 0,
        }
    }

    pub fn audio(id: u32) -> Self {
        Self {
            id: TrackId(id),
            kind: TrackKind::Audio,
            width: 0,
            height: 0,
            fps: 0.0,
            rotation_degrees: 0,
        }
    }

    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// A video track is usable when it has a picture to decode.
    pub fn is_usable_video(&self) -> bool {
        self.kind == TrackKind::Video && self.width > 0 && self.height > 0
    }

    pub fn preferred_transform(&self) -> MediaTransform {
        MediaTransform::from_rotation_degrees(self.rotation_degrees)
    }

    /// Coded frame format, before the preferred transform.
    pub fn coded_format(&self) -> PixelFormat {
        PixelFormat::new(self.width, self.height)
    }

    /// Frame format as displayed, after the preferred transform.
    pub fn display_format(&self) -> PixelFormat {
        let coded = self.coded_format();
        if self.preferred_transform().swaps_dimensions() {
            coded.swapped()
        } else {
            coded
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.preferred_transform().swaps_dimensions() {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

/// A loaded source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub path: PathBuf,

    /// Duration in seconds.
    pub duration_secs: f64,

    pub tracks: Vec<TrackInfo>,
}

impl AssetInfo {
    pub fn video_tracks(&self) -> impl Iterator<Item = &TrackInfo> {
        self.tracks.iter().filter(|track| track.is_usable_video())
    }

    /// The first usable video track, if any.
    pub fn first_video_track(&self) -> Option<&TrackInfo> {
        self.video_tracks().next()
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|track| track.kind == TrackKind::Audio)
    }

    /// Expected number of frames for the first video track.
    pub fn expected_frames(&self) -> u64 {
        self.first_video_track()
            .map(|track| (self.duration_secs.max(0.0) * track.fps.max(0.0)).ceil() as u64)
            .unwrap_or(0)
    }
}
