//! The AI-authored narrative document.
//!
//! The document itself stays a `serde_json::Value`: its shape is a wire
//! contract with downstream stages (field names, not Rust types) and the
//! generative backend is free to include extra fields that must survive
//! round-trips. Structural validation happens before persistence, so a
//! stored document always carries the required fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ProjectId;

/// One-to-one with a project; upserted by the Showrunner stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub project_id: ProjectId,
    pub document: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Narrative {
    pub fn new(project_id: ProjectId, document: Value) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            document,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ordered narration points, if present.
    pub fn narration_points(&self) -> &[Value] {
        self.document
            .get("narration_points")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cut/trim instructions, if present.
    pub fn cuts_and_trims(&self) -> &[Value] {
        self.document
            .get("cuts_and_trims")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Summary counts logged after a narrative is generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeStats {
    pub characters: usize,
    pub key_moments: usize,
    pub narration_points: usize,
    pub shorts_suggestions: usize,
    pub episode_duration_target: u64,
}

impl NarrativeStats {
    pub fn from_document(document: &Value) -> Self {
        let len = |field: &str| {
            document
                .get(field)
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0)
        };
        Self {
            characters: len("characters"),
            key_moments: len("key_moments"),
            narration_points: len("narration_points"),
            shorts_suggestions: len("shorts_suggestions"),
            episode_duration_target: document
                .get("metadata")
                .and_then(|m| m.get("episode_duration_target"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_count_document_sections() {
        let document = json!({
            "characters": [{"id": "person_1"}, {"id": "person_2"}],
            "key_moments": [{"scene_id": "s1"}],
            "narration_points": [{"id": "n1"}, {"id": "n2"}, {"id": "n3"}],
            "metadata": {"episode_duration_target": 600}
        });
        let stats = NarrativeStats::from_document(&document);
        assert_eq!(stats.characters, 2);
        assert_eq!(stats.key_moments, 1);
        assert_eq!(stats.narration_points, 3);
        assert_eq!(stats.shorts_suggestions, 0);
        assert_eq!(stats.episode_duration_target, 600);
    }

    #[test]
    fn accessors_tolerate_missing_sections() {
        let narrative = Narrative::new(ProjectId::new(), json!({}));
        assert!(narrative.narration_points().is_empty());
        assert!(narrative.cuts_and_trims().is_empty());
    }
}
