//! Identifier newtypes.
//!
//! Every entity id is a UUID-backed string newtype with transparent serde,
//! so ids stay copyable across process boundaries without leaking the
//! underlying representation into call sites.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Create from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a project.
    ProjectId
);
string_id!(
    /// Unique identifier for an uploaded video.
    VideoId
);
string_id!(
    /// Unique identifier for a detected scene.
    SceneId
);
string_id!(
    /// Unique identifier for an export artifact.
    ExportId
);
string_id!(
    /// Unique identifier for a queued job.
    JobId
);
