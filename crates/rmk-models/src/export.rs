//! Export artifact records. Append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ExportId, ProjectId};

/// Kind of rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportKind {
    Episode,
    Short,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Episode => "EPISODE",
            ExportKind::Short => "SHORT",
        }
    }
}

/// A rendered output file produced by the export stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub id: ExportId,
    pub project_id: ProjectId,
    pub kind: ExportKind,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl Export {
    pub fn new(project_id: ProjectId, kind: ExportKind, filename: impl Into<String>) -> Self {
        Self {
            id: ExportId::new(),
            project_id,
            kind,
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }
}
