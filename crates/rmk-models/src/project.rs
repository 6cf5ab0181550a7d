//! Project entity and the pipeline status state machine.
//!
//! `ProjectStatus` is the single source of truth for pipeline position.
//! Transitions are forward-only along the success path, with `Failed`
//! reachable from any non-terminal state; `Completed` and `Failed` are
//! absorbing. Stage executors are the only writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

/// Editorial style requested for the generated episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StyleTag {
    #[default]
    Dramatic,
    Comedic,
    Documentary,
}

impl StyleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTag::Dramatic => "DRAMATIC",
            StyleTag::Comedic => "COMEDIC",
            StyleTag::Documentary => "DOCUMENTARY",
        }
    }
}

/// Pipeline position of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Created,
    Uploading,
    Analyzing,
    Showrunning,
    Narrating,
    Editing,
    Exporting,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Created => "CREATED",
            ProjectStatus::Uploading => "UPLOADING",
            ProjectStatus::Analyzing => "ANALYZING",
            ProjectStatus::Showrunning => "SHOWRUNNING",
            ProjectStatus::Narrating => "NARRATING",
            ProjectStatus::Editing => "EDITING",
            ProjectStatus::Exporting => "EXPORTING",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Failed => "FAILED",
        }
    }

    /// The unique successor on the success path, if any.
    pub fn next(&self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::Created => Some(ProjectStatus::Uploading),
            ProjectStatus::Uploading => Some(ProjectStatus::Analyzing),
            ProjectStatus::Analyzing => Some(ProjectStatus::Showrunning),
            ProjectStatus::Showrunning => Some(ProjectStatus::Narrating),
            ProjectStatus::Narrating => Some(ProjectStatus::Editing),
            ProjectStatus::Editing => Some(ProjectStatus::Exporting),
            ProjectStatus::Exporting => Some(ProjectStatus::Completed),
            ProjectStatus::Completed | ProjectStatus::Failed => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }

    /// Whether a transition to `to` is legal.
    ///
    /// Re-asserting the current status is allowed so that a retried stage
    /// executor can set its own status idempotently. Forward moves follow
    /// `next()` exactly; `Failed` is reachable from any non-terminal state.
    pub fn can_transition_to(&self, to: ProjectStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if to == *self {
            return true;
        }
        if to == ProjectStatus::Failed {
            return true;
        }
        self.next() == Some(to)
    }

    /// Coarse completion percentage for status display. Observability only.
    pub fn progress_percent(&self) -> u8 {
        match self {
            ProjectStatus::Created => 0,
            ProjectStatus::Uploading => 10,
            ProjectStatus::Analyzing => 30,
            ProjectStatus::Showrunning => 50,
            ProjectStatus::Narrating => 65,
            ProjectStatus::Editing => 80,
            ProjectStatus::Exporting => 90,
            ProjectStatus::Completed => 100,
            ProjectStatus::Failed => 0,
        }
    }

    /// Rough remaining wall-clock estimate for status display. Observability only.
    pub fn estimated_seconds_remaining(&self) -> u32 {
        match self {
            ProjectStatus::Created => 600,
            ProjectStatus::Uploading => 300,
            ProjectStatus::Analyzing => 180,
            ProjectStatus::Showrunning => 120,
            ProjectStatus::Narrating => 60,
            ProjectStatus::Editing => 180,
            ProjectStatus::Exporting => 120,
            ProjectStatus::Completed | ProjectStatus::Failed => 0,
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read model for the status observability surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ProjectStatus,
    pub progress_percent: u8,
    pub estimated_seconds_remaining: u32,
}

impl From<ProjectStatus> for StatusReport {
    fn from(status: ProjectStatus) -> Self {
        Self {
            status,
            progress_percent: status.progress_percent(),
            estimated_seconds_remaining: status.estimated_seconds_remaining(),
        }
    }
}

/// A project: one episode-in-the-making, owning videos, scenes, a narrative
/// and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub style: StyleTag,
    #[serde(default)]
    pub status: ProjectStatus,
    /// Human-readable reason attached when the project reaches `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Set by `cancel`; prevents new jobs from being scheduled. Does not
    /// interrupt in-flight work.
    #[serde(default)]
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project in `Created` state.
    pub fn new(title: impl Into<String>, style: StyleTag) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            title: title.into(),
            style,
            status: ProjectStatus::Created,
            failure_reason: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status read model for this project.
    pub fn status_report(&self) -> StatusReport {
        StatusReport::from(self.status)
    }

    /// Whether a new job may still be scheduled against this project.
    pub fn accepts_work(&self) -> bool {
        !self.status.is_terminal() && !self.cancel_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ProjectStatus; 9] = [
        ProjectStatus::Created,
        ProjectStatus::Uploading,
        ProjectStatus::Analyzing,
        ProjectStatus::Showrunning,
        ProjectStatus::Narrating,
        ProjectStatus::Editing,
        ProjectStatus::Exporting,
        ProjectStatus::Completed,
        ProjectStatus::Failed,
    ];

    #[test]
    fn every_non_failed_state_has_exactly_one_successor() {
        for status in ALL {
            match status {
                ProjectStatus::Completed | ProjectStatus::Failed => {
                    assert_eq!(status.next(), None)
                }
                _ => assert!(status.next().is_some(), "{status} has no successor"),
            }
        }
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [ProjectStatus::Completed, ProjectStatus::Failed] {
            for target in ALL {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be rejected"
                );
            }
        }
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        for status in ALL {
            if !status.is_terminal() {
                assert!(status.can_transition_to(ProjectStatus::Failed));
            }
        }
    }

    #[test]
    fn no_stage_skipping_on_success_path() {
        // Analyzing may move to Showrunning but not jump to Narrating.
        assert!(ProjectStatus::Analyzing.can_transition_to(ProjectStatus::Showrunning));
        assert!(!ProjectStatus::Analyzing.can_transition_to(ProjectStatus::Narrating));
        // Backward transitions are never legal.
        assert!(!ProjectStatus::Narrating.can_transition_to(ProjectStatus::Analyzing));
    }

    #[test]
    fn reasserting_current_status_is_idempotent() {
        assert!(ProjectStatus::Showrunning.can_transition_to(ProjectStatus::Showrunning));
    }

    #[test]
    fn status_report_uses_lookup_tables() {
        let report = StatusReport::from(ProjectStatus::Narrating);
        assert_eq!(report.progress_percent, 65);
        assert_eq!(report.estimated_seconds_remaining, 60);

        let done = StatusReport::from(ProjectStatus::Completed);
        assert_eq!(done.progress_percent, 100);
        assert_eq!(done.estimated_seconds_remaining, 0);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ProjectStatus::Showrunning).unwrap();
        assert_eq!(json, "\"SHOWRUNNING\"");
    }
}
