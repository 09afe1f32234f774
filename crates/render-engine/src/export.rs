//! Media exporter: the entry point for image and video exports.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use framekit_common::config::{FramekitConfig, OutputFileType};
use framekit_common::error::{ExportError, ExportResult, FramekitError};
use framekit_media_model::color::Color;
use framekit_media_model::filter_type::FilterType;
use framekit_media_model::frame::{FrameBuffer, SampleBuffer};
use framekit_media_model::job::ExportJobState;
use framekit_media_model::media_info::MediaInfo;
use framekit_media_model::overlay::OverlaySet;
use framekit_media_model::preset::ExportPreset;
use image::DynamicImage;
use tokio::sync::watch;

use crate::compositor::{as_frame_sequence, FrameSequenceCompositorFactory};
use crate::context::{CpuContext, ProcessingContext};
use crate::host::{CompositionHost, SessionSettings, SessionStatus};
use crate::progress::{ExportStage, ProgressCallback, ProgressReporter};
use crate::renderer::Renderer;

static OUTPUT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What the exporter applies to media when processing is enabled.
#[derive(Debug, Clone, Default)]
pub struct ProcessingConfig {
    pub filter_type: FilterType,
    pub overlays: OverlaySet,
    pub background_fill: Color,
}

/// Exports still images and videos through the frame transform pipeline.
///
/// Processing starts disabled, in which case both exports hand their input
/// back untouched. Exports borrow the exporter mutably, so at most one job
/// runs per exporter.
pub struct MediaExporter<H> {
    host: H,
    context: Arc<dyn ProcessingContext>,
    config: FramekitConfig,
    processing: Option<ProcessingConfig>,
    state: watch::Sender<ExportJobState>,
}

impl<H: CompositionHost> MediaExporter<H> {
    /// Exporter rendering on the CPU context.
    pub fn new(host: H, config: FramekitConfig) -> Self {
        Self::with_context(host, Arc::new(CpuContext), config)
    }

    pub fn with_context(host: H, context: Arc<dyn ProcessingContext>, config: FramekitConfig) -> Self {
        let (state, _) = watch::channel(ExportJobState::Idle);
        Self {
            host,
            context,
            config,
            processing: None,
            state,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &FramekitConfig {
        &self.config
    }

    pub fn enable_processing(&mut self, processing: ProcessingConfig) {
        self.processing = Some(processing);
    }

    pub fn disable_processing(&mut self) {
        self.processing = None;
    }

    /// Current processing configuration, `None` when disabled.
    pub fn processing(&self) -> Option<&ProcessingConfig> {
        self.processing.as_ref()
    }

    pub fn needs_processing(&self) -> bool {
        self.processing.is_some()
    }

    /// Select the filter. Enables processing.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.processing_mut().filter_type = filter_type;
    }

    /// Replace the overlays. Enables processing.
    pub fn set_overlays(&mut self, overlays: OverlaySet) {
        self.processing_mut().overlays = overlays;
    }

    /// Set the background fill. Enables processing.
    pub fn set_background_fill(&mut self, color: Color) {
        self.processing_mut().background_fill = color;
    }

    /// Observe the export job state.
    pub fn subscribe_state(&self) -> watch::Receiver<ExportJobState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ExportJobState {
        *self.state.borrow()
    }

    fn processing_mut(&mut self) -> &mut ProcessingConfig {
        self.processing.get_or_insert_with(ProcessingConfig::default)
    }

    fn transition(&self, next: ExportJobState) {
        let previous = self.state.send_replace(next);
        if !previous.can_transition_to(next) {
            tracing::warn!(from = %previous, to = %next, "Unexpected export state transition");
        }
        tracing::debug!(from = %previous, to = %next, "Export state changed");
    }

    /// Run a still image through the pipeline.
    ///
    /// `time_secs` is the presentation time the frame is rendered at.
    pub fn export_image(&self, image: DynamicImage, time_secs: f64) -> ExportResult<DynamicImage> {
        let Some(processing) = &self.processing else {
            tracing::debug!("Processing disabled; returning image unchanged");
            return Ok(image);
        };

        let frame = FrameBuffer::from_image(&image)?;
        let sample = SampleBuffer::at_secs(frame, time_secs)?;

        let mut renderer = Renderer::new(self.context.clone());
        renderer.set_filter_type(processing.filter_type);
        renderer.set_overlays(processing.overlays.clone());
        renderer.set_background_fill(processing.background_fill);
        renderer.refresh_filter();

        let mut output = None;
        renderer
            .prime(&sample)
            .produce(sample, |rendered| output = Some(rendered))?;

        let (frame, _) = output.ok_or(ExportError::NoProcessedImage)?.into_parts();
        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            filter = %processing.filter_type,
            "Image exported"
        );
        Ok(frame.into_dynamic_image())
    }

    /// Export a video through the host with the per-frame compositor.
    ///
    /// Returns the path of the new file, or `source` itself when processing
    /// is disabled. `observer` receives throttled progress while the host
    /// job runs and nothing after its terminal update.
    pub async fn export_video(
        &mut self,
        source: &Path,
        media_info: &MediaInfo,
        observer: Option<ProgressCallback>,
    ) -> ExportResult<PathBuf> {
        let Some(processing) = self.processing.clone() else {
            tracing::debug!(source = %source.display(), "Processing disabled; returning source unchanged");
            return Ok(source.to_path_buf());
        };

        tracing::info!(
            source = %source.display(),
            host = self.host.name(),
            filter = %processing.filter_type,
            overlays = processing.overlays.len(),
            "Starting video export"
        );
        self.transition(ExportJobState::Configuring);

        let result = self
            .run_video_export(source, media_info, &processing, observer)
            .await;

        let terminal = match &result {
            Ok(_) => ExportJobState::Completed,
            Err(ExportError::Incomplete) => ExportJobState::Incomplete,
            Err(_) => ExportJobState::Failed,
        };
        self.transition(terminal);

        match &result {
            Ok(path) => tracing::info!(output = %path.display(), "Video export completed"),
            Err(err) => tracing::error!(error = %err, "Video export failed"),
        }
        result
    }

    async fn run_video_export(
        &self,
        source: &Path,
        media_info: &MediaInfo,
        processing: &ProcessingConfig,
        observer: Option<ProgressCallback>,
    ) -> ExportResult<PathBuf> {
        let asset = self.host.load_asset(source)?;
        let track = asset
            .first_video_track()
            .cloned()
            .ok_or(ExportError::NoVideoTrack)?;

        let presets = self.host.compatible_presets(&asset);
        let preset = ExportPreset::best_of(&presets).ok_or(ExportError::NoPresets)?;

        let output_path = prepare_output_path(&self.config.output_dir, self.config.export.file_type)?;
        let settings = SessionSettings {
            output_path: output_path.clone(),
            file_type: self.config.export.file_type,
            optimize_for_network: self.config.export.optimize_for_network,
            metadata: media_info.metadata_items(),
        };
        tracing::info!(
            preset = %preset,
            output = %output_path.display(),
            orientation = ?track.orientation(),
            "Creating export session"
        );

        let factory = FrameSequenceCompositorFactory::new(self.context.clone());
        let mut session = self
            .host
            .create_session(&asset, preset, settings, &factory)?;

        let compositor = session
            .custom_compositor()
            .and_then(as_frame_sequence)
            .ok_or(ExportError::NoCompositor)?;
        compositor.set_switch_input_dimensions(track.orientation().is_portrait());
        compositor.set_media_transform(track.preferred_transform());
        compositor.set_filter_type(processing.filter_type);
        compositor.set_overlays(processing.overlays.clone());
        compositor.set_background_fill(processing.background_fill);
        compositor.refresh_filter();

        let reporter = ProgressReporter::new(
            observer,
            self.config.export.progress_interval(),
            asset.expected_frames(),
        );
        self.transition(ExportJobState::Running);
        let status = session.export(reporter.clone()).await;

        match status {
            SessionStatus::Completed => {
                reporter.finish(ExportStage::Complete);
                Ok(output_path)
            }
            SessionStatus::Failed(err) => {
                reporter.finish(ExportStage::Failed);
                discard_partial_output(&output_path);
                Err(ExportError::Export(err))
            }
            SessionStatus::Cancelled => {
                reporter.finish(ExportStage::Failed);
                discard_partial_output(&output_path);
                Err(ExportError::Incomplete)
            }
        }
    }
}

/// Allocate a fresh output path in `dir`, clearing any file already there.
pub fn prepare_output_path(dir: &Path, file_type: OutputFileType) -> ExportResult<PathBuf> {
    if dir.exists() && !dir.is_dir() {
        return Err(FramekitError::config(format!(
            "output_dir {} is not a directory",
            dir.display()
        ))
        .into());
    }
    std::fs::create_dir_all(dir).map_err(FramekitError::from)?;
    let name = format!(
        "framekit-{}-{}-{}.{}",
        Utc::now().format("%Y%m%d-%H%M%S%3f"),
        std::process::id(),
        OUTPUT_COUNTER.fetch_add(1, Ordering::Relaxed),
        file_type.extension()
    );
    let path = dir.join(name);
    clear_existing_output(&path)?;
    Ok(path)
}

/// Delete a stale file at `path`, if any.
pub fn clear_existing_output(path: &Path) -> ExportResult<()> {
    if !path.exists() {
        return Ok(());
    }
    tracing::debug!(path = %path.display(), "Removing existing output file");
    std::fs::remove_file(path).map_err(|source| ExportError::FailedDeleteExistingFile {
        path: path.to_path_buf(),
        source,
    })
}

// Whatever a failed session left behind is not a usable export.
fn discard_partial_output(path: &Path) {
    if let Err(err) = clear_existing_output(path) {
        tracing::warn!(error = %err, "Could not remove partial export output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = prepare_output_path(dir.path(), OutputFileType::Mov).unwrap();
        let b = prepare_output_path(dir.path(), OutputFileType::Mov).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "mov");
        assert_eq!(a.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("today");
        let path = prepare_output_path(&nested, OutputFileType::Mp4).unwrap();
        assert!(nested.is_dir());
        assert_eq!(path.extension().unwrap(), "mp4");
    }

    #[test]
    fn test_output_dir_that_is_a_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("exports");
        std::fs::write(&file, b"not a dir").unwrap();
        let err = prepare_output_path(&file, OutputFileType::Mov).unwrap_err();
        assert!(matches!(err, ExportError::Export(FramekitError::Config { .. })));
    }

    #[test]
    fn test_partial_output_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.mov");
        std::fs::write(&path, b"truncated").unwrap();
        discard_partial_output(&path);
        assert!(!path.exists());
        // Nothing there is fine too.
        discard_partial_output(&path);
    }

    #[test]
    fn test_existing_output_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.mov");
        std::fs::write(&path, b"old").unwrap();
        clear_existing_output(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_undeletable_output_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("occupied.mov");
        std::fs::create_dir(&path).unwrap();
        let err = clear_existing_output(&path).unwrap_err();
        assert!(matches!(err, ExportError::FailedDeleteExistingFile { .. }));
    }
}
