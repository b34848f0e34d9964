//! Scene lock controller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shotline_models::{GroupStatus, SceneId};

use crate::error::{ContinuityError, ContinuityResult};
use crate::repository::GroupRepository;

/// Whether a scene's continuity is frozen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Fail with `Locked` if edits are frozen.
    pub fn ensure_unlocked(&self, scene_id: &SceneId) -> ContinuityResult<()> {
        if self.locked {
            Err(ContinuityError::Locked(scene_id.clone()))
        } else {
            Ok(())
        }
    }

    /// Freeze the scene. Requires at least one approved group; locking an
    /// already locked scene keeps the original timestamp.
    pub fn lock(&mut self, groups: &GroupRepository) -> ContinuityResult<()> {
        if groups.count(GroupStatus::Approved) == 0 {
            return Err(ContinuityError::NoApprovedGroups(groups.scene_id().clone()));
        }
        if !self.locked {
            self.locked = true;
            self.locked_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.locked = false;
        self.locked_at = None;
    }
}
