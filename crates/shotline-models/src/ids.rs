//! Identifier newtypes.
//!
//! All identifiers are opaque strings on the wire. Group ids are generated
//! here; shot, scene and video ids are minted by the systems that own them.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Video (project) that owns a set of scenes. Persistence is keyed by it.
    VideoId
);

string_id!(
    /// Scene within a video.
    SceneId
);

string_id!(
    /// Shot within a scene.
    ShotId
);

string_id!(
    /// Continuity group identity. Stable across edits that keep the group.
    GroupId
);

impl GroupId {
    /// Generate a new random group ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ids_are_unique() {
        assert_ne!(GroupId::new(), GroupId::new());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ShotId::from("shot-1")).unwrap();
        assert_eq!(json, "\"shot-1\"");

        let scene: SceneId = serde_json::from_str("\"scene-9\"").unwrap();
        assert_eq!(scene.as_str(), "scene-9");
        assert_eq!(scene.to_string(), "scene-9");
    }
}
