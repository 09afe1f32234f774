//! Host media layer the exporter drives.
//!
//! A host loads source assets, tells which export presets fit them, and
//! runs export sessions that call back into an installed compositor for
//! every frame.

use std::path::{Path, PathBuf};

use framekit_common::config::OutputFileType;
use framekit_common::error::{FramekitError, FramekitResult};
use framekit_media_model::media_info::MetadataItem;
use framekit_media_model::preset::ExportPreset;
use framekit_media_model::track::AssetInfo;

use crate::compositor::{CompositorFactory, VideoCompositing};
use crate::progress::ProgressReporter;

/// Output settings for one export session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub output_path: PathBuf,
    pub file_type: OutputFileType,
    /// Arrange the container for progressive playback.
    pub optimize_for_network: bool,
    /// Container metadata written into the output.
    pub metadata: Vec<MetadataItem>,
}

/// Terminal status of an export session.
#[derive(Debug)]
pub enum SessionStatus {
    Completed,
    Failed(FramekitError),
    Cancelled,
}

/// A media composition engine.
pub trait CompositionHost: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Read tracks and duration of a source asset.
    fn load_asset(&self, path: &Path) -> FramekitResult<AssetInfo>;

    /// Presets this host can export the asset with.
    fn compatible_presets(&self, asset: &AssetInfo) -> Vec<ExportPreset>;

    /// Create a session that composes frames with a compositor built by
    /// `factory`.
    fn create_session(
        &self,
        asset: &AssetInfo,
        preset: ExportPreset,
        settings: SessionSettings,
        factory: &dyn CompositorFactory,
    ) -> FramekitResult<Box<dyn ExportSession>>;
}

/// A configured export job on the host.
#[async_trait::async_trait]
pub trait ExportSession: Send {
    /// The compositor the session installed, if any.
    fn custom_compositor(&mut self) -> Option<&mut dyn VideoCompositing>;

    /// Run the export to a terminal status, pushing progress into
    /// `reporter`. Must not finish the reporter.
    async fn export(&mut self, reporter: ProgressReporter) -> SessionStatus;
}
