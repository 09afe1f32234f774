//! Host media layer backed by the `ffmpeg` and `ffprobe` binaries.
//!
//! ```text
//! source ── ffmpeg (decode, raw RGBA) ──► compositor ──► ffmpeg (libx264) ── output
//!    └────────────────────── audio copy ─────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use framekit_common::clock::PresentationTime;
use framekit_common::config::{ExportDefaults, OutputFileType};
use framekit_common::error::{FramekitError, FramekitResult};
use framekit_media_model::frame::{FrameBuffer, PixelFormat, SampleBuffer};
use framekit_media_model::preset::ExportPreset;
use framekit_media_model::track::{AssetInfo, TrackId, TrackInfo, TrackKind};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;

use crate::compositor::{CompositionRequest, CompositorFactory, VideoCompositing};
use crate::host::{CompositionHost, ExportSession, SessionSettings, SessionStatus};
use crate::progress::ProgressReporter;

const DEFAULT_FPS: f64 = 30.0;

/// Host driving ffmpeg child processes.
#[derive(Debug, Clone)]
pub struct FfmpegHost {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegHost {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(defaults: &ExportDefaults) -> Self {
        Self::new(&defaults.ffmpeg_path, &defaults.ffprobe_path)
    }

    /// Whether both binaries can be started.
    pub fn is_available(&self) -> bool {
        self.ffmpeg_available() && self.ffprobe_available()
    }

    pub fn ffmpeg_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    pub fn ffprobe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }
}

impl CompositionHost for FfmpegHost {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn load_asset(&self, path: &Path) -> FramekitResult<AssetInfo> {
        if !path.exists() {
            return Err(FramekitError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
            .arg(path)
            .output()
            .map_err(|e| FramekitError::host(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(FramekitError::host(format!(
                "ffprobe failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let asset = parse_probe_output(path, &raw)?;
        tracing::debug!(
            path = %path.display(),
            tracks = asset.tracks.len(),
            duration_secs = asset.duration_secs,
            "Probed source asset"
        );
        Ok(asset)
    }

    fn compatible_presets(&self, asset: &AssetInfo) -> Vec<ExportPreset> {
        if !self.is_available() {
            tracing::warn!(
                ffmpeg = %self.ffmpeg.display(),
                ffprobe = %self.ffprobe.display(),
                "ffmpeg binaries unavailable; no presets offered"
            );
            return Vec::new();
        }
        let Some(track) = asset.first_video_track() else {
            return Vec::new();
        };
        let format = track.display_format();
        ExportPreset::ALL
            .into_iter()
            .filter(|preset| preset.accepts(format))
            .collect()
    }

    fn create_session(
        &self,
        asset: &AssetInfo,
        preset: ExportPreset,
        settings: SessionSettings,
        factory: &dyn CompositorFactory,
    ) -> FramekitResult<Box<dyn ExportSession>> {
        let track = asset
            .first_video_track()
            .cloned()
            .ok_or_else(|| FramekitError::host("Source has no video track"))?;

        Ok(Box::new(FfmpegExportSession {
            ffmpeg: self.ffmpeg.clone(),
            source: asset.path.clone(),
            has_audio: asset.has_audio(),
            expected_frames: asset.expected_frames(),
            track,
            preset,
            settings,
            compositor: factory.create(),
        }))
    }
}

/// One export run: decode, compose, encode.
pub struct FfmpegExportSession {
    ffmpeg: PathBuf,
    source: PathBuf,
    has_audio: bool,
    expected_frames: u64,
    track: TrackInfo,
    preset: ExportPreset,
    settings: SessionSettings,
    compositor: Box<dyn VideoCompositing>,
}

impl FfmpegExportSession {
    fn fps(&self) -> f64 {
        if self.track.fps.is_finite() && self.track.fps > 0.0 {
            self.track.fps
        } else {
            DEFAULT_FPS
        }
    }

    async fn run(&mut self, reporter: &ProgressReporter) -> FramekitResult<u64> {
        let coded = self.track.coded_format();
        let output = self.track.display_format();
        let fps = self.fps();

        let decoder_args = decoder_args(&self.source);
        let encoder_args = encoder_args(&EncoderPlan {
            source: &self.source,
            output,
            fps,
            has_audio: self.has_audio,
            preset: self.preset,
            settings: &self.settings,
        });
        tracing::debug!(args = ?decoder_args, "Starting ffmpeg decoder");
        tracing::debug!(args = ?encoder_args, "Starting ffmpeg encoder");

        let mut decoder = tokio::process::Command::new(&self.ffmpeg)
            .args(&decoder_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FramekitError::host(format!("Failed to start ffmpeg decoder: {e}")))?;
        let mut encoder = tokio::process::Command::new(&self.ffmpeg)
            .args(&encoder_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FramekitError::host(format!("Failed to start ffmpeg encoder: {e}")))?;

        let decoder_stderr = drain_stderr(&mut decoder);
        let encoder_stderr = drain_stderr(&mut encoder);

        let mut frames_in = decoder
            .stdout
            .take()
            .ok_or_else(|| FramekitError::host("Failed to capture ffmpeg decoder stdout"))?;
        let mut frames_out = encoder
            .stdin
            .take()
            .ok_or_else(|| FramekitError::host("Failed to capture ffmpeg encoder stdin"))?;

        tracing::info!(
            source = %self.source.display(),
            output = %self.settings.output_path.display(),
            width = output.width,
            height = output.height,
            fps,
            preset = %self.preset,
            expected_frames = self.expected_frames,
            "ffmpeg session started"
        );

        self.compositor.render_context_changed(output);

        let streamed = self
            .stream_frames(&mut frames_in, &mut frames_out, coded, output, fps, reporter)
            .await;
        let frames_written = match streamed {
            Ok(frames) => frames,
            Err(PipeFailure::Read(err)) => {
                drop(frames_in);
                let status = decoder.wait().await?;
                return Err(FramekitError::host(format!(
                    "ffmpeg decode failed (status {status}, {err}): {}",
                    collect_stderr(decoder_stderr).await
                )));
            }
            Err(PipeFailure::Write(err)) => {
                drop(frames_out);
                let status = encoder.wait().await?;
                return Err(FramekitError::host(format!(
                    "ffmpeg encode failed (status {status}, {err}): {}",
                    collect_stderr(encoder_stderr).await
                )));
            }
            Err(PipeFailure::Frame(err)) => return Err(err),
        };
        drop(frames_out);
        reporter.finalizing();

        let decoder_status = decoder.wait().await?;
        let encoder_status = encoder.wait().await?;
        if !decoder_status.success() {
            return Err(FramekitError::host(format!(
                "ffmpeg decode failed (status {decoder_status}): {}",
                collect_stderr(decoder_stderr).await
            )));
        }
        if !encoder_status.success() {
            return Err(FramekitError::host(format!(
                "ffmpeg encode failed (status {encoder_status}): {}",
                collect_stderr(encoder_stderr).await
            )));
        }
        if frames_written == 0 {
            return Err(FramekitError::host("Source produced no video frames"));
        }

        Ok(frames_written)
    }

    /// Pump decoded frames through the compositor into the encoder, in order.
    async fn stream_frames<R, W>(
        &mut self,
        frames_in: &mut R,
        frames_out: &mut W,
        coded: PixelFormat,
        output: PixelFormat,
        fps: f64,
        reporter: &ProgressReporter,
    ) -> Result<u64, PipeFailure>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames_written = 0u64;
        while let Some(frame) = read_frame(frames_in, coded).await? {
            let time = PresentationTime::for_frame(frames_written, fps);
            let composed = self.compose(frame, time).await.map_err(PipeFailure::Frame)?;
            if composed.format() != output {
                return Err(PipeFailure::Frame(FramekitError::render(format!(
                    "Compositor returned {}x{} frame, expected {}x{}",
                    composed.format().width,
                    composed.format().height,
                    output.width,
                    output.height
                ))));
            }
            frames_out
                .write_all(composed.frame().as_bytes())
                .await
                .map_err(PipeFailure::Write)?;

            frames_written += 1;
            reporter.report_frames(frames_written);
        }
        frames_out.shutdown().await.map_err(PipeFailure::Write)?;
        Ok(frames_written)
    }

    async fn compose(&mut self, frame: FrameBuffer, time: PresentationTime) -> FramekitResult<SampleBuffer> {
        let sample = SampleBuffer::new(frame, time);
        let (request, response) = CompositionRequest::new(time, vec![(self.track.id, sample)]);
        self.compositor.start_request(request);
        match response.await {
            Ok(Ok(sample)) => Ok(sample),
            Ok(Err(err)) => Err(FramekitError::render(format!(
                "Composition failed at {time}: {err}"
            ))),
            Err(_) => Err(FramekitError::render(format!(
                "Compositor dropped request at {time}"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl ExportSession for FfmpegExportSession {
    fn custom_compositor(&mut self) -> Option<&mut dyn VideoCompositing> {
        Some(self.compositor.as_mut())
    }

    async fn export(&mut self, reporter: ProgressReporter) -> SessionStatus {
        let started = std::time::Instant::now();
        match self.run(&reporter).await {
            Ok(frames) => {
                tracing::info!(
                    frames,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "ffmpeg session finished"
                );
                SessionStatus::Completed
            }
            Err(err) => {
                self.compositor.cancel_all_pending();
                tracing::error!(error = %err, "ffmpeg session failed");
                SessionStatus::Failed(err)
            }
        }
    }
}

/// Where streaming frames between the ffmpeg processes broke off.
#[derive(Debug)]
enum PipeFailure {
    /// Reading the decoder's output failed.
    Read(std::io::Error),
    /// The encoder stopped accepting frames.
    Write(std::io::Error),
    Frame(FramekitError),
}

struct EncoderPlan<'a> {
    source: &'a Path,
    output: PixelFormat,
    fps: f64,
    has_audio: bool,
    preset: ExportPreset,
    settings: &'a SessionSettings,
}

fn decoder_args(source: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        // Frames come out as coded; the compositor applies orientation.
        "-noautorotate".to_string(),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-".to_string(),
    ]
}

fn encoder_args(plan: &EncoderPlan<'_>) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", plan.output.width, plan.output.height),
        "-r".to_string(),
        format!("{:.3}", plan.fps),
        "-i".to_string(),
        "-".to_string(),
    ];

    if plan.has_audio {
        args.extend([
            "-i".to_string(),
            plan.source.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "1:a?".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
        ]);
    }

    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-crf".to_string(),
        plan.preset.crf().to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]);

    if plan.settings.optimize_for_network {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }

    for item in &plan.settings.metadata {
        args.extend(["-metadata".to_string(), format!("{}={}", item.key, item.value)]);
    }

    let container = match plan.settings.file_type {
        OutputFileType::Mov => "mov",
        OutputFileType::Mp4 => "mp4",
    };
    args.extend(["-f".to_string(), container.to_string()]);
    args.push(plan.settings.output_path.to_string_lossy().to_string());
    args
}

/// Read one raw RGBA frame. `None` at end of stream.
async fn read_frame<R>(reader: &mut R, format: PixelFormat) -> Result<Option<FrameBuffer>, PipeFailure>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; format.frame_len()];
    match reader.read_exact(&mut buffer).await {
        Ok(_) => FrameBuffer::from_raw(format, buffer).map(Some).ok_or_else(|| {
            PipeFailure::Frame(FramekitError::host("Decoded frame has an invalid size"))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(PipeFailure::Read(e)),
    }
}

// Drain stderr concurrently so ffmpeg never blocks on a full pipe.
fn drain_stderr(child: &mut Child) -> Option<tokio::task::JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut output = String::new();
        match stderr.read_to_string(&mut output).await {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    }))
}

async fn collect_stderr(task: Option<tokio::task::JoinHandle<String>>) -> String {
    match task {
        Some(task) => task
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
        None => String::new(),
    }
}

fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl ProbeStream {
    fn kind(&self) -> TrackKind {
        match self.codec_type.as_deref() {
            Some("video") => TrackKind::Video,
            Some("audio") => TrackKind::Audio,
            _ => TrackKind::Other,
        }
    }

    fn fps(&self) -> f64 {
        [&self.avg_frame_rate, &self.r_frame_rate]
            .into_iter()
            .flatten()
            .filter_map(|rate| parse_frame_rate(rate))
            .next()
            .unwrap_or(0.0)
    }

    /// Clockwise display rotation.
    fn rotation_degrees(&self) -> i32 {
        if let Some(rotate) = self.tags.get("rotate").and_then(|v| v.trim().parse::<i32>().ok()) {
            return rotate;
        }
        // Display matrix side data is counter-clockwise.
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .map(|ccw| -(ccw.round() as i32))
            .unwrap_or(0)
    }
}

fn parse_frame_rate(raw: &str) -> Option<f64> {
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_duration(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

/// Build an [`AssetInfo`] from `ffprobe -of json` output.
fn parse_probe_output(path: &Path, raw: &str) -> FramekitResult<AssetInfo> {
    let probe: ProbeOutput = serde_json::from_str(raw)?;

    let container_duration = probe
        .format
        .as_ref()
        .and_then(|format| parse_duration(format.duration.as_deref()));
    let stream_duration = probe
        .streams
        .iter()
        .filter(|s| s.kind() == TrackKind::Video)
        .find_map(|s| parse_duration(s.duration.as_deref()));

    let tracks = probe
        .streams
        .iter()
        .map(|stream| TrackInfo {
            id: TrackId(stream.index),
            kind: stream.kind(),
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            fps: stream.fps(),
            rotation_degrees: stream.rotation_degrees(),
        })
        .collect();

    Ok(AssetInfo {
        path: path.to_path_buf(),
        duration_secs: container_duration.or(stream_duration).unwrap_or(0.0),
        tracks,
    })
}
