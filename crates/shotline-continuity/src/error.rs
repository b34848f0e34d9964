//! Continuity engine error types.

use thiserror::Error;

use shotline_models::{SceneId, ShotId};

/// Result type for continuity operations.
pub type ContinuityResult<T> = Result<T, ContinuityError>;

/// Errors returned by the edit engine and lock controller.
///
/// Every error is raised before a transaction commits, so the scene is left
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinuityError {
    #[error("Group not found in scene {scene_id}: {target}")]
    GroupNotFound { scene_id: SceneId, target: String },

    #[error("Shots {shot_a} -> {shot_b} are not adjacent in scene {scene_id}")]
    InvalidConnection {
        scene_id: SceneId,
        shot_a: ShotId,
        shot_b: ShotId,
    },

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Continuity for scene {0} is locked")]
    Locked(SceneId),

    #[error("Scene {0} has no approved continuity groups")]
    NoApprovedGroups(SceneId),

    #[error("Scene not found: {0}")]
    SceneNotFound(SceneId),
}

impl ContinuityError {
    pub fn group_not_found(scene_id: &SceneId, target: impl Into<String>) -> Self {
        Self::GroupNotFound {
            scene_id: scene_id.clone(),
            target: target.into(),
        }
    }

    pub fn invalid_group(msg: impl Into<String>) -> Self {
        Self::InvalidGroup(msg.into())
    }

    /// Short machine-readable code, used as a metrics label and in API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ContinuityError::GroupNotFound { .. } => "group_not_found",
            ContinuityError::InvalidConnection { .. } => "invalid_connection",
            ContinuityError::InvalidGroup(_) => "invalid_group",
            ContinuityError::Locked(_) => "locked",
            ContinuityError::NoApprovedGroups(_) => "no_approved_groups",
            ContinuityError::SceneNotFound(_) => "scene_not_found",
        }
    }
}
