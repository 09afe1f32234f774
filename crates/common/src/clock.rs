//! Clock and timing utilities for frame timing and progress throttling.
//!
//! - Presentation times for samples handed through the pipeline
//! - A job clock measuring elapsed wall time for ETA estimates
//! - A rate controller that limits how often progress is emitted

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Presentation time of a frame, in nanoseconds from the start of the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PresentationTime {
    nanos: u64,
}

impl PresentationTime {
    pub const ZERO: PresentationTime = PresentationTime { nanos: 0 };

    /// Create a presentation time from seconds.
    ///
    /// Returns `None` for negative, NaN or infinite values.
    pub fn from_secs(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        Some(Self {
            nanos: (secs * 1_000_000_000.0).round() as u64,
        })
    }

    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Presentation time of frame `index` in a stream running at `fps`.
    pub fn for_frame(index: u64, fps: f64) -> Self {
        if fps <= 0.0 || !fps.is_finite() {
            return Self::ZERO;
        }
        Self {
            nanos: ((index as f64 / fps) * 1_000_000_000.0).round() as u64,
        }
    }

    pub fn as_nanos(&self) -> u64 {
        self.nanos
    }

    pub fn as_secs(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }
}

impl std::fmt::Display for PresentationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs())
    }
}

/// Wall clock for a single export job.
#[derive(Debug, Clone)]
pub struct JobClock {
    epoch: Instant,
}

impl JobClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the job started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Seconds elapsed since the job started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Remaining seconds extrapolated from a fraction complete.
    pub fn eta_secs(&self, fraction: f64) -> f64 {
        let elapsed = self.elapsed_secs();
        if fraction <= 0.0 {
            return 0.0;
        }
        ((elapsed / fraction) - elapsed).max(0.0)
    }
}

/// Rate controller that lets at most one tick through per interval.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller with a fixed interval between ticks.
    pub fn new(interval: Duration) -> Self {
        Self {
            target_interval_ns: interval.as_nanos() as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_time_rejects_invalid_seconds() {
        assert!(PresentationTime::from_secs(-0.5).is_none());
        assert!(PresentationTime::from_secs(f64::NAN).is_none());
        assert!(PresentationTime::from_secs(f64::INFINITY).is_none());
        assert_eq!(
            PresentationTime::from_secs(1.5).unwrap().as_nanos(),
            1_500_000_000
        );
    }

    #[test]
    fn test_presentation_time_for_frame() {
        let t = PresentationTime::for_frame(30, 30.0);
        assert_eq!(t.as_nanos(), 1_000_000_000);
        assert_eq!(PresentationTime::for_frame(10, 0.0), PresentationTime::ZERO);
        assert!(PresentationTime::for_frame(1, 30.0) < PresentationTime::for_frame(2, 30.0));
    }

    #[test]
    fn test_job_clock_eta() {
        let clock = JobClock::start();
        assert!(clock.elapsed_ns() < 1_000_000_000);
        assert_eq!(clock.eta_secs(0.0), 0.0);
        assert!(clock.eta_secs(0.5) >= 0.0);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(Duration::from_millis(500));
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(100_000_000));
        assert!(ctrl.should_tick(500_000_000));
        assert!(!ctrl.should_tick(900_000_000));
        assert_eq!(ctrl.interval_ns(), 500_000_000);
    }

    #[test]
    fn test_zero_interval_passes_every_tick() {
        let mut ctrl = RateController::new(Duration::ZERO);
        assert!(ctrl.should_tick(5));
        assert!(ctrl.should_tick(5));
        assert!(ctrl.should_tick(6));
    }
}
