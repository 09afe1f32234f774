//! Export progress reporting.
//!
//! Hosts push progress into a [`ProgressReporter`] as frames are written.
//! The reporter throttles updates to a fixed interval, never lets the
//! reported fraction go backwards, and goes silent for good once the job
//! is finished.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use framekit_common::clock::{JobClock, RateController};

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render (0 when unknown).
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

impl ExportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

struct ReporterState {
    callback: Option<ProgressCallback>,
    rate: RateController,
    clock: JobClock,
    total_frames: u64,
    last_progress: f64,
    last_frames: u64,
    emitted: u64,
    finished: bool,
}

/// Shared, throttled progress sink for one export job.
///
/// Clones feed the same job. Updates after [`ProgressReporter::finish`]
/// are dropped.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<Mutex<ReporterState>>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>, interval: Duration, total_frames: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState {
                callback,
                rate: RateController::new(interval),
                clock: JobClock::start(),
                total_frames,
                last_progress: 0.0,
                last_frames: 0,
                emitted: 0,
                finished: false,
            })),
        }
    }

    /// A reporter with no observer; still tracks the latest fraction.
    pub fn silent(total_frames: u64) -> Self {
        Self::new(None, Duration::ZERO, total_frames)
    }

    /// Record progress as a fraction in `[0.0, 1.0]`.
    ///
    /// Emits at most once per interval. Values lower than the last report
    /// are raised to it.
    pub fn report(&self, fraction: f64, frames_rendered: u64) {
        self.with_state(|state| {
            if state.finished {
                return;
            }
            let fraction = if fraction.is_finite() {
                fraction.clamp(0.0, 1.0)
            } else {
                state.last_progress
            };
            state.last_progress = state.last_progress.max(fraction);
            state.last_frames = state.last_frames.max(frames_rendered);

            let now_ns = state.clock.elapsed_ns();
            if !state.rate.should_tick(now_ns) {
                return;
            }
            let update = ExportProgress {
                progress: state.last_progress,
                frames_rendered: state.last_frames,
                total_frames: state.total_frames,
                eta_secs: state.clock.eta_secs(state.last_progress),
                stage: ExportStage::Rendering,
            };
            emit(state, update);
        });
    }

    /// Record progress from a frame count against the expected total.
    pub fn report_frames(&self, frames_rendered: u64) {
        let total = self.total_frames();
        let fraction = if total == 0 {
            0.0
        } else {
            frames_rendered as f64 / total as f64
        };
        self.report(fraction, frames_rendered);
    }

    /// Announce that every frame is written and the output is being closed.
    ///
    /// Not throttled. Ignored once the reporter is finished.
    pub fn finalizing(&self) {
        self.with_state(|state| {
            if state.finished {
                return;
            }
            let update = ExportProgress {
                progress: state.last_progress,
                frames_rendered: state.last_frames,
                total_frames: state.total_frames,
                eta_secs: 0.0,
                stage: ExportStage::Finalizing,
            };
            emit(state, update);
        });
    }

    /// Emit the terminal update and stop reporting.
    ///
    /// Returns `false` if the reporter was already finished, in which case
    /// nothing is emitted.
    pub fn finish(&self, stage: ExportStage) -> bool {
        let mut first = false;
        self.with_state(|state| {
            if state.finished {
                return;
            }
            state.finished = true;
            first = true;

            let progress = if stage == ExportStage::Complete {
                1.0
            } else {
                state.last_progress
            };
            state.last_progress = progress;
            let update = ExportProgress {
                progress,
                frames_rendered: state.last_frames,
                total_frames: state.total_frames,
                eta_secs: 0.0,
                stage,
            };
            emit(state, update);
            // Release the observer; nothing reaches it past this point.
            state.callback = None;
        });
        first
    }

    pub fn is_finished(&self) -> bool {
        self.read(|state| state.finished).unwrap_or(true)
    }

    /// Latest fraction recorded, emitted or not.
    pub fn last_progress(&self) -> f64 {
        self.read(|state| state.last_progress).unwrap_or(0.0)
    }

    /// Number of updates delivered to the observer.
    pub fn emitted(&self) -> u64 {
        self.read(|state| state.emitted).unwrap_or(0)
    }

    fn total_frames(&self) -> u64 {
        self.read(|state| state.total_frames).unwrap_or(0)
    }

    fn read<T>(&self, f: impl FnOnce(&ReporterState) -> T) -> Option<T> {
        match self.state.lock() {
            Ok(state) => Some(f(&state)),
            Err(_) => None,
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut ReporterState)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(err) => {
                tracing::warn!(error = %err, "Progress reporter unavailable; dropping update");
            }
        }
    }
}

fn emit(state: &mut ReporterState, update: ExportProgress) {
    tracing::trace!(progress = update.progress, stage = ?update.stage, "Export progress");
    if let Some(cb) = &state.callback {
        cb(update);
        state.emitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collecting(interval: Duration) -> (ProgressReporter, mpsc::Receiver<ExportProgress>) {
        let (tx, rx) = mpsc::channel();
        let cb: ProgressCallback = Box::new(move |p| {
            let _ = tx.send(p);
        });
        (ProgressReporter::new(Some(cb), interval, 100), rx)
    }

    #[test]
    fn test_progress_never_decreases() {
        let (reporter, rx) = collecting(Duration::ZERO);
        reporter.report(0.2, 20);
        reporter.report(0.1, 10);
        reporter.report(0.5, 50);
        reporter.finish(ExportStage::Complete);

        let values: Vec<f64> = rx.try_iter().map(|p| p.progress).collect();
        assert_eq!(values, vec![0.2, 0.2, 0.5, 1.0]);
    }

    #[test]
    fn test_nothing_after_finish() {
        let (reporter, rx) = collecting(Duration::ZERO);
        reporter.report(0.3, 30);
        assert!(reporter.finish(ExportStage::Failed));
        assert!(!reporter.finish(ExportStage::Complete));
        reporter.report(0.9, 90);

        let updates: Vec<ExportProgress> = rx.try_iter().collect();
        assert_eq!(updates.len(), 2);
        let last = updates.last().unwrap();
        assert_eq!(last.stage, ExportStage::Failed);
        assert!((last.progress - 0.3).abs() < 1e-9);
        assert!(reporter.is_finished());
    }

    #[test]
    fn test_updates_are_throttled() {
        let (reporter, rx) = collecting(Duration::from_secs(3600));
        for i in 0..50 {
            reporter.report_frames(i);
        }
        reporter.finish(ExportStage::Complete);

        let updates: Vec<ExportProgress> = rx.try_iter().collect();
        // First tick always passes, then only the terminal update.
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].stage, ExportStage::Complete);
        assert_eq!(updates[1].frames_rendered, 49);
    }

    #[test]
    fn test_finalizing_bypasses_throttle() {
        let (reporter, rx) = collecting(Duration::from_secs(3600));
        reporter.report_frames(10);
        reporter.report_frames(60);
        reporter.finalizing();
        reporter.finish(ExportStage::Complete);
        reporter.finalizing();

        let stages: Vec<ExportStage> = rx.try_iter().map(|p| p.stage).collect();
        assert_eq!(
            stages,
            vec![ExportStage::Rendering, ExportStage::Finalizing, ExportStage::Complete]
        );
    }

    #[test]
    fn test_finalizing_keeps_last_fraction() {
        let (reporter, rx) = collecting(Duration::ZERO);
        reporter.report_frames(60);
        reporter.finalizing();
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.stage, ExportStage::Finalizing);
        assert!((last.progress - 0.6).abs() < 1e-9);
        assert_eq!(last.frames_rendered, 60);
        assert!(!reporter.is_finished());
    }

    #[test]
    fn test_silent_reporter_tracks_progress() {
        let reporter = ProgressReporter::silent(10);
        reporter.report_frames(4);
        assert!((reporter.last_progress() - 0.4).abs() < 1e-9);
        assert_eq!(reporter.emitted(), 0);
    }

    #[test]
    fn test_non_finite_fraction_is_ignored() {
        let (reporter, rx) = collecting(Duration::ZERO);
        reporter.report(0.4, 40);
        reporter.report(f64::NAN, 41);
        let values: Vec<f64> = rx.try_iter().map(|p| p.progress).collect();
        assert_eq!(values, vec![0.4, 0.4]);
    }
}
