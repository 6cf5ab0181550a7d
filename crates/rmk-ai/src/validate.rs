//! Structural validation of generated narrative documents.
//!
//! Pure function over the parsed JSON. Only documents that pass this check
//! are ever persisted; a missing field is reported by name so the retry
//! loop can log what the backend got wrong.

use serde_json::Value;

use crate::error::{AiError, AiResult};

const REQUIRED_FIELDS: [&str; 5] = [
    "characters",
    "narrative_structure",
    "key_moments",
    "narration_points",
    "metadata",
];

const REQUIRED_ACTS: [&str; 3] = ["act_1", "act_2", "act_3"];

/// Check that a generated document has the required narrative shape.
pub fn validate_narrative(document: &Value) -> AiResult<()> {
    let object = document
        .as_object()
        .ok_or_else(|| AiError::MissingField("<document is not an object>".to_string()))?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(AiError::MissingField(field.to_string()));
        }
    }

    let structure = &object["narrative_structure"];
    for act in REQUIRED_ACTS {
        if structure.get(act).is_none() {
            return Err(AiError::MissingField(format!("narrative_structure.{act}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "characters": [],
            "narrative_structure": {
                "act_1": {"title": "Setup"},
                "act_2": {"title": "Conflict"},
                "act_3": {"title": "Resolution"}
            },
            "key_moments": [],
            "narration_points": [],
            "cuts_and_trims": [],
            "shorts_suggestions": [],
            "metadata": {}
        })
    }

    #[test]
    fn valid_document_passes() {
        assert!(validate_narrative(&valid_document()).is_ok());
    }

    #[test]
    fn each_missing_top_level_field_is_rejected_by_name() {
        for field in REQUIRED_FIELDS {
            let mut document = valid_document();
            document.as_object_mut().unwrap().remove(field);
            match validate_narrative(&document) {
                Err(AiError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn each_missing_act_is_rejected() {
        for act in REQUIRED_ACTS {
            let mut document = valid_document();
            document["narrative_structure"]
                .as_object_mut()
                .unwrap()
                .remove(act);
            match validate_narrative(&document) {
                Err(AiError::MissingField(name)) => {
                    assert_eq!(name, format!("narrative_structure.{act}"))
                }
                other => panic!("expected missing act error, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(validate_narrative(&json!([1, 2, 3])).is_err());
        assert!(validate_narrative(&json!("a string")).is_err());
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let mut document = valid_document();
        document
            .as_object_mut()
            .unwrap()
            .insert("soundtrack_notes".to_string(), json!(["cue 1"]));
        assert!(validate_narrative(&document).is_ok());
    }
}
