//! Shot models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{SceneId, ShotId};

/// A shot as owned by the shot sequence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    /// Stable shot ID
    pub id: ShotId,

    /// Scene the shot belongs to
    pub scene_id: SceneId,

    /// Index within the scene's ordered sequence
    pub position: u32,
}

impl Shot {
    /// Create a new shot.
    pub fn new(id: impl Into<ShotId>, scene_id: impl Into<SceneId>, position: u32) -> Self {
        Self {
            id: id.into(),
            scene_id: scene_id.into(),
            position,
        }
    }
}

/// A shot carrying the pre-group `isLinkedToPrevious` flag.
///
/// Only used as input to legacy link migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LegacyShot {
    pub id: ShotId,

    pub scene_id: SceneId,

    pub position: u32,

    /// Whether this shot continues the previous one
    #[serde(default)]
    pub is_linked_to_previous: bool,
}

impl LegacyShot {
    pub fn new(
        id: impl Into<ShotId>,
        scene_id: impl Into<SceneId>,
        position: u32,
        is_linked_to_previous: bool,
    ) -> Self {
        Self {
            id: id.into(),
            scene_id: scene_id.into(),
            position,
            is_linked_to_previous,
        }
    }

    /// Drop the legacy flag.
    pub fn to_shot(&self) -> Shot {
        Shot {
            id: self.id.clone(),
            scene_id: self.scene_id.clone(),
            position: self.position,
        }
    }
}
