//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global FrameKit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramekitConfig {
    /// Directory where exported videos are written.
    pub output_dir: PathBuf,

    /// Export defaults.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Container written by video exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFileType {
    #[default]
    Mov,
    Mp4,
}

impl OutputFileType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Mp4 => "mp4",
        }
    }
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Minimum interval between progress updates, in milliseconds.
    pub progress_interval_ms: u64,

    /// Container for exported videos.
    pub file_type: OutputFileType,

    /// Whether to lay out the container for progressive playback.
    pub optimize_for_network: bool,

    /// ffmpeg binary used for decoding and encoding.
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary used for asset inspection.
    pub ffprobe_path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framekit=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for FramekitConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            progress_interval_ms: 500,
            file_type: OutputFileType::Mov,
            optimize_for_network: true,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl ExportDefaults {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl FramekitConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framekit").join("config.json")
}

/// Default export directory inside the system temp dir.
fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("framekit-exports")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FramekitConfig::default();
        assert_eq!(config.export.progress_interval(), Duration::from_millis(500));
        assert_eq!(config.export.file_type, OutputFileType::Mov);
        assert!(config.export.optimize_for_network);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "output_dir": "/var/tmp/out",
                "export": {
                    "progress_interval_ms": 250,
                    "file_type": "mp4",
                    "optimize_for_network": false,
                    "ffmpeg_path": "ffmpeg",
                    "ffprobe_path": "ffprobe"
                }
            }"#,
        )
        .unwrap();

        let loaded = FramekitConfig::load_from(&path);
        assert_eq!(loaded.export.file_type, OutputFileType::Mp4);
        assert_eq!(loaded.export.progress_interval_ms, 250);
        assert!(!loaded.export.optimize_for_network);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = FramekitConfig::load_from(&path);
        assert_eq!(loaded.export.progress_interval_ms, 500);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: FramekitConfig =
            serde_json::from_str(r#"{ "output_dir": "/var/tmp/out" }"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/var/tmp/out"));
        assert_eq!(config.export.ffmpeg_path, PathBuf::from("ffmpeg"));
    }
}
