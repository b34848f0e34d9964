//! Continuity group models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, SceneId, ShotId};

/// Approval state of a continuity group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Suggested by the AI breakdown or left over from a split
    Proposed,
    /// Confirmed by the user
    Approved,
    /// Rejected by the user; kept for history only
    Declined,
}

impl GroupStatus {
    pub const ALL: [GroupStatus; 3] = [
        GroupStatus::Approved,
        GroupStatus::Proposed,
        GroupStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Proposed => "proposed",
            GroupStatus::Approved => "approved",
            GroupStatus::Declined => "declined",
        }
    }

    /// Returns true if groups in this state contribute live connections.
    pub fn is_live(&self) -> bool {
        matches!(self, GroupStatus::Proposed | GroupStatus::Approved)
    }
}

/// A contiguous chain of shots that must render as one continuous take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityGroup {
    pub id: GroupId,

    pub scene_id: SceneId,

    /// Display ordinal within the scene, not an identity key
    pub group_number: u32,

    /// Ordered shots; at least two, consecutive by position
    pub shot_ids: Vec<ShotId>,

    pub status: GroupStatus,

    /// Free-form transition label (e.g. "flow")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,

    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ContinuityGroup {
    /// Create a new group with a fresh id.
    pub fn new(
        scene_id: impl Into<SceneId>,
        group_number: u32,
        shot_ids: Vec<ShotId>,
        status: GroupStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: GroupId::new(),
            scene_id: scene_id.into(),
            group_number,
            shot_ids,
            status,
            transition_type: None,
            description: None,
            edited_by: None,
            edited_at: None,
            approved_at: (status == GroupStatus::Approved).then_some(now),
            created_at: now,
        }
    }

    /// Set the transition label.
    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.transition_type = Some(transition.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adjacent shot pairs in chain order.
    pub fn edges(&self) -> impl Iterator<Item = (&ShotId, &ShotId)> + '_ {
        self.shot_ids.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Returns true if `a` is immediately followed by `b` in this chain.
    pub fn contains_edge(&self, a: &ShotId, b: &ShotId) -> bool {
        self.edges().any(|(x, y)| x == a && y == b)
    }

    /// Returns true if the two chains have at least one edge in common.
    pub fn shares_edge_with(&self, other: &ContinuityGroup) -> bool {
        self.edges().any(|(a, b)| other.contains_edge(a, b))
    }

    pub fn position_of(&self, shot: &ShotId) -> Option<usize> {
        self.shot_ids.iter().position(|s| s == shot)
    }

    pub fn first_shot(&self) -> Option<&ShotId> {
        self.shot_ids.first()
    }

    pub fn last_shot(&self) -> Option<&ShotId> {
        self.shot_ids.last()
    }

    /// Copy of this group's descriptive fields over a different shot run.
    ///
    /// The copy gets a fresh id and creation time; status and approval time
    /// are carried over.
    pub fn split_off(&self, shot_ids: Vec<ShotId>, group_number: u32) -> Self {
        Self {
            id: GroupId::new(),
            group_number,
            shot_ids,
            created_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// A group suggested by the AI breakdown generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityGroupDraft {
    /// Display ordinal; zero means "assign one"
    #[serde(default)]
    pub group_number: u32,

    pub shot_ids: Vec<ShotId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ContinuityGroupDraft {
    pub fn new(shot_ids: Vec<ShotId>) -> Self {
        Self {
            group_number: 0,
            shot_ids,
            transition_type: None,
            description: None,
        }
    }

    /// Materialize as a proposed group.
    pub fn into_group(self, scene_id: impl Into<SceneId>, group_number: u32) -> ContinuityGroup {
        let mut group =
            ContinuityGroup::new(scene_id, group_number, self.shot_ids, GroupStatus::Proposed);
        group.transition_type = self.transition_type;
        group.description = self.description;
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shots(ids: &[&str]) -> Vec<ShotId> {
        ids.iter().map(|s| ShotId::from(*s)).collect()
    }

    #[test]
    fn test_edges_and_containment() {
        let group = ContinuityGroup::new("sc", 1, shots(&["a", "b", "c"]), GroupStatus::Proposed);
        let edges: Vec<_> = group.edges().collect();
        assert_eq!(edges.len(), 2);
        assert!(group.contains_edge(&"a".into(), &"b".into()));
        assert!(group.contains_edge(&"b".into(), &"c".into()));
        assert!(!group.contains_edge(&"a".into(), &"c".into()));
        assert!(!group.contains_edge(&"b".into(), &"a".into()));
    }

    #[test]
    fn test_shares_edge_with() {
        let left = ContinuityGroup::new("sc", 1, shots(&["a", "b", "c"]), GroupStatus::Approved);
        let touching = ContinuityGroup::new("sc", 2, shots(&["c", "d"]), GroupStatus::Approved);
        let overlapping = ContinuityGroup::new("sc", 3, shots(&["b", "c", "d"]), GroupStatus::Approved);
        assert!(!left.shares_edge_with(&touching));
        assert!(left.shares_edge_with(&overlapping));
    }

    #[test]
    fn test_new_sets_approved_at_only_when_approved() {
        let approved = ContinuityGroup::new("sc", 1, shots(&["a", "b"]), GroupStatus::Approved);
        let proposed = ContinuityGroup::new("sc", 1, shots(&["a", "b"]), GroupStatus::Proposed);
        assert!(approved.approved_at.is_some());
        assert!(proposed.approved_at.is_none());
    }

    #[test]
    fn test_split_off_keeps_descriptive_fields() {
        let group = ContinuityGroup::new("sc", 1, shots(&["a", "b", "c"]), GroupStatus::Approved)
            .with_transition("flow")
            .with_description("walk and talk");
        let part = group.split_off(shots(&["b", "c"]), 4);
        assert_ne!(part.id, group.id);
        assert_eq!(part.group_number, 4);
        assert_eq!(part.status, GroupStatus::Approved);
        assert_eq!(part.transition_type.as_deref(), Some("flow"));
        assert_eq!(part.approved_at, group.approved_at);
    }

    #[test]
    fn test_group_serializes_camel_case_with_null_timestamps() {
        let group = ContinuityGroup::new("sc", 1, shots(&["a", "b"]), GroupStatus::Proposed);
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["sceneId"], "sc");
        assert_eq!(value["shotIds"], serde_json::json!(["a", "b"]));
        assert_eq!(value["status"], "proposed");
        assert!(value["approvedAt"].is_null());
        assert!(value["editedAt"].is_null());
        assert!(value["createdAt"].is_string());
        assert!(value.get("transitionType").is_none());
    }

    #[test]
    fn test_draft_into_group_is_proposed() {
        let draft = ContinuityGroupDraft {
            group_number: 0,
            shot_ids: shots(&["a", "b"]),
            transition_type: Some("match cut".into()),
            description: None,
        };
        let group = draft.into_group("sc", 7);
        assert_eq!(group.status, GroupStatus::Proposed);
        assert_eq!(group.group_number, 7);
        assert_eq!(group.transition_type.as_deref(), Some("match cut"));
    }
}
