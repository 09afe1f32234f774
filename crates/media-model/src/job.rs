//! Export job lifecycle.

use serde::{Deserialize, Serialize};

/// State of the export job owned by a media exporter.
///
/// `Idle → Configuring → Running → (Completed | Failed | Incomplete)`.
/// A terminal state returns to `Configuring` when the next job starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportJobState {
    #[default]
    Idle,
    Configuring,
    Running,
    Completed,
    Failed,
    Incomplete,
}

impl ExportJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Incomplete)
    }

    /// Whether a job may start from this state.
    pub fn accepts_new_job(&self) -> bool {
        matches!(self, Self::Idle) || self.is_terminal()
    }

    /// Whether moving to `next` follows the job lifecycle.
    pub fn can_transition_to(&self, next: ExportJobState) -> bool {
        use ExportJobState::*;
        match (*self, next) {
            (state, Configuring) => state.accepts_new_job(),
            (Configuring, Running) => true,
            (Configuring, Failed) => true,
            (Running, Completed | Failed | Incomplete) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ExportJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Incomplete => "incomplete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::ExportJobState::*;

    #[test]
    fn test_lifecycle_transitions() {
        assert!(Idle.can_transition_to(Configuring));
        assert!(Configuring.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Configuring));
        assert!(!Running.can_transition_to(Configuring));
        assert!(!Idle.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Running));
    }

    #[test]
    fn test_setup_failure_is_allowed_before_running() {
        assert!(Configuring.can_transition_to(Failed));
        assert!(!Configuring.can_transition_to(Incomplete));
    }
}
