//! Error types shared across FrameKit crates.

use std::path::PathBuf;

/// Top-level error type for FrameKit operations.
#[derive(Debug, thiserror::Error)]
pub enum FramekitError {
    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Host media error: {message}")]
    Host { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramekitError.
pub type FramekitResult<T> = Result<T, FramekitError>;

impl FramekitError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

/// Failures surfaced by an image or video export.
///
/// Every export reports through one `Result`; none of these fall back to
/// unfiltered output.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The source image could not be turned into a raw pixel surface.
    #[error("source image could not be converted to a pixel buffer")]
    NoPixelBuffer,

    /// The pixel surface could not be wrapped into a processable sample.
    #[error("pixel buffer could not be wrapped into a sample buffer")]
    NoSampleBuffer,

    /// The renderer produced no usable output frame.
    #[error("renderer produced no processed image")]
    NoProcessedImage,

    /// No export preset is compatible with the source.
    #[error("no compatible export preset for source")]
    NoPresets,

    /// The source has no usable video track.
    #[error("source has no usable video track")]
    NoVideoTrack,

    /// The host did not hand back the compositor that was installed.
    #[error("export session did not provide the installed compositor")]
    NoCompositor,

    /// A stale file at the output location could not be removed.
    #[error("failed to delete existing output file {path}: {source}")]
    FailedDeleteExistingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host export job failed.
    #[error("export failed: {0}")]
    Export(#[source] FramekitError),

    /// The host export job ended without completing or failing.
    #[error("export did not complete")]
    Incomplete,
}

/// Result type alias using ExportError.
pub type ExportResult<T> = Result<T, ExportError>;

impl From<FramekitError> for ExportError {
    fn from(err: FramekitError) -> Self {
        Self::Export(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_wraps_underlying_error() {
        let err: ExportError = FramekitError::host("encoder exited with status 1").into();
        assert!(matches!(err, ExportError::Export(FramekitError::Host { .. })));
        assert_eq!(
            err.to_string(),
            "export failed: Host media error: encoder exited with status 1"
        );
    }

    #[test]
    fn test_delete_failure_keeps_source() {
        let err = ExportError::FailedDeleteExistingFile {
            path: PathBuf::from("/tmp/out.mov"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
