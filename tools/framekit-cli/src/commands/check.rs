//! Check the host setup.

use framekit_common::config::{config_file_path, FramekitConfig};
use framekit_render_engine::FfmpegHost;

pub fn run(config: &FramekitConfig) -> anyhow::Result<()> {
    println!("FrameKit System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not found)", config_path.display());
    }

    let host = FfmpegHost::from_config(&config.export);
    let ffmpeg_ok = report_binary("ffmpeg", host.ffmpeg_path(), host.ffmpeg_available());
    let ffprobe_ok = report_binary("ffprobe", host.ffprobe_path(), host.ffprobe_available());

    println!("     Output directory: {}", config.output_dir.display());
    println!(
        "     Container: {} (faststart: {})",
        config.export.file_type.extension(),
        config.export.optimize_for_network
    );

    println!();
    if ffmpeg_ok && ffprobe_ok {
        println!("Image and video export are available.");
    } else {
        println!("Image export is available. Video export needs ffmpeg and ffprobe.");
    }

    Ok(())
}

fn report_binary(label: &str, path: &std::path::Path, available: bool) -> bool {
    if available {
        println!("[OK] {label}: {}", path.display());
    } else {
        println!("[WARN] {label}: {} not found", path.display());
    }
    available
}
