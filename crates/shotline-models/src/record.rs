//! Persisted continuity documents.
//!
//! Saving always writes the full [`ContinuityDocument`] for a video.
//! Loading goes through [`StoredContinuityDocument`], which tolerates data
//! written before groups carried a status. [`migrate_record`] is the only
//! place that fills the missing status in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::group::{ContinuityGroup, GroupStatus};
use crate::ids::{GroupId, SceneId, ShotId};

/// Document body for `PATCH /scenes/{videoId}/continuity`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityDocument {
    /// Merged groups per scene (approved, then proposed, then declined)
    pub continuity_groups: BTreeMap<SceneId, Vec<ContinuityGroup>>,

    pub locked: bool,
}

impl ContinuityDocument {
    pub fn group_count(&self) -> usize {
        self.continuity_groups.values().map(Vec::len).sum()
    }
}

/// A group as it may appear in stored data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: GroupId,

    pub scene_id: SceneId,

    #[serde(default)]
    pub group_number: u32,

    pub shot_ids: Vec<ShotId>,

    /// Missing on data written before approval states existed
    #[serde(default)]
    pub status: Option<GroupStatus>,

    #[serde(default)]
    pub transition_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub edited_by: Option<String>,

    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Convert a stored record into a domain group.
///
/// Records without a status predate proposals and were always approved.
pub fn migrate_record(record: GroupRecord) -> ContinuityGroup {
    ContinuityGroup {
        id: record.id,
        scene_id: record.scene_id,
        group_number: record.group_number,
        shot_ids: record.shot_ids,
        status: record.status.unwrap_or(GroupStatus::Approved),
        transition_type: record.transition_type,
        description: record.description,
        edited_by: record.edited_by,
        edited_at: record.edited_at,
        approved_at: record.approved_at,
        created_at: record.created_at,
    }
}

impl From<&ContinuityGroup> for GroupRecord {
    fn from(group: &ContinuityGroup) -> Self {
        Self {
            id: group.id.clone(),
            scene_id: group.scene_id.clone(),
            group_number: group.group_number,
            shot_ids: group.shot_ids.clone(),
            status: Some(group.status),
            transition_type: group.transition_type.clone(),
            description: group.description.clone(),
            edited_by: group.edited_by.clone(),
            edited_at: group.edited_at,
            approved_at: group.approved_at,
            created_at: group.created_at,
        }
    }
}

/// Continuity document as returned by the persistence service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredContinuityDocument {
    #[serde(default)]
    pub continuity_groups: BTreeMap<SceneId, Vec<GroupRecord>>,

    #[serde(default)]
    pub locked: bool,
}

impl StoredContinuityDocument {
    /// Apply [`migrate_record`] to every record.
    pub fn migrate(self) -> ContinuityDocument {
        ContinuityDocument {
            continuity_groups: self
                .continuity_groups
                .into_iter()
                .map(|(scene, records)| (scene, records.into_iter().map(migrate_record).collect()))
                .collect(),
            locked: self.locked,
        }
    }
}
