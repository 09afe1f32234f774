//! Export a video through the filter pipeline.

use std::io::Write;
use std::path::PathBuf;

use framekit_common::config::FramekitConfig;
use framekit_media_model::media_info::MediaInfo;
use framekit_render_engine::{ExportProgress, ExportStage, FfmpegHost, MediaExporter};

use crate::ProcessingArgs;

pub struct MetadataArgs {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

pub async fn run(
    mut config: FramekitConfig,
    input: PathBuf,
    output_dir: Option<PathBuf>,
    metadata: MetadataArgs,
    processing: ProcessingArgs,
) -> anyhow::Result<()> {
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    println!("Exporting video: {}", input.display());
    println!("  Filter: {}", processing.filter);
    println!("  Overlays: {}", processing.overlays.len());
    println!("  Output directory: {}", config.output_dir.display());

    let host = FfmpegHost::from_config(&config.export);
    let mut exporter = MediaExporter::new(host, config);
    exporter.enable_processing(super::processing_config(&processing)?);

    let mut info = MediaInfo::new().with_source_app(concat!("framekit ", env!("CARGO_PKG_VERSION")));
    info.title = metadata.title;
    info.author = metadata.author;
    info.description = metadata.description;
    info.creation_date = Some(chrono::Utc::now());

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        write_progress(&mut std::io::stdout(), &p).ok();
    });

    match exporter.export_video(&input, &info, Some(progress_cb)).await {
        Ok(path) => {
            println!("\nExport complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {e}");
            Err(e.into())
        }
    }
}

/// Rewrite the progress line in place and flush it.
fn write_progress<W: Write>(out: &mut W, p: &ExportProgress) -> std::io::Result<()> {
    match p.stage {
        ExportStage::Rendering => write!(
            out,
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        )?,
        ExportStage::Finalizing => write!(out, "\r  Finalizing {} frames...{:24}", p.frames_rendered, "")?,
        ExportStage::Complete | ExportStage::Failed => return Ok(()),
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Terminal {
        written: Vec<u8>,
        flushes: usize,
    }

    impl Write for Terminal {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn progress(stage: ExportStage, frames: u64) -> ExportProgress {
        ExportProgress {
            progress: frames as f64 / 10.0,
            frames_rendered: frames,
            total_frames: 10,
            eta_secs: 2.0,
            stage,
        }
    }

    #[test]
    fn test_progress_line_is_flushed() {
        let mut term = Terminal::default();
        write_progress(&mut term, &progress(ExportStage::Rendering, 4)).unwrap();
        assert_eq!(term.flushes, 1);
        let line = String::from_utf8(term.written).unwrap();
        assert!(line.starts_with("\r  Progress: 40.0% (4/10 frames"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_terminal_updates_print_nothing() {
        let mut term = Terminal::default();
        write_progress(&mut term, &progress(ExportStage::Complete, 10)).unwrap();
        assert!(term.written.is_empty());
        assert_eq!(term.flushes, 0);
    }
}
