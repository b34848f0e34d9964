//! Continuity state of a single scene.

use serde::Serialize;

use shotline_models::{
    Connection, ContinuityGroup, ContinuityGroupDraft, GroupId, GroupStatus, LegacyShot,
    SceneId, Shot, ShotId, VideoId,
};

use crate::derivation::derive_connections;
use crate::engine::{self, EditOutcome, GroupEdit, MigrationMode};
use crate::error::ContinuityResult;
use crate::lock::LockState;
use crate::repository::{GroupRepository, Transaction};
use crate::shot_index::ShotIndex;

/// What the renderer reads for a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub scene_id: SceneId,
    pub video_id: VideoId,
    pub locked: bool,
    /// Approved, then proposed, then declined
    pub groups: Vec<ContinuityGroup>,
    pub connections: Vec<Connection>,
}

impl SceneView {
    pub fn groups_with_status(&self, status: GroupStatus) -> impl Iterator<Item = &ContinuityGroup> {
        self.groups.iter().filter(move |g| g.status == status)
    }
}

/// Shots, groups and lock flag of one scene.
///
/// Every edit goes through [`SceneContinuity::mutate`], which checks the
/// lock, runs the engine on a transaction and commits only on success.
#[derive(Debug, Clone)]
pub struct SceneContinuity {
    scene_id: SceneId,
    video_id: VideoId,
    shots: ShotIndex,
    groups: GroupRepository,
    lock: LockState,
}

impl SceneContinuity {
    pub fn new(video_id: VideoId, scene_id: SceneId) -> Self {
        Self {
            groups: GroupRepository::new(scene_id.clone()),
            scene_id,
            video_id,
            shots: ShotIndex::default(),
            lock: LockState::default(),
        }
    }

    pub fn scene_id(&self) -> &SceneId {
        &self.scene_id
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn shots(&self) -> &ShotIndex {
        &self.shots
    }

    pub fn groups(&self) -> &GroupRepository {
        &self.groups
    }

    fn mutate<F>(&mut self, f: F) -> ContinuityResult<EditOutcome>
    where
        F: FnOnce(&mut Transaction, &ShotIndex) -> ContinuityResult<EditOutcome>,
    {
        self.lock.ensure_unlocked(&self.scene_id)?;
        let mut tx = self.groups.begin();
        let outcome = f(&mut tx, &self.shots)?;
        if outcome.is_applied() {
            self.groups.commit(tx);
        }
        Ok(outcome)
    }

    pub fn approve_group(&mut self, group_id: &GroupId) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, _| engine::approve_group(tx, group_id))
    }

    pub fn decline_group(&mut self, group_id: &GroupId) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, _| engine::decline_group(tx, group_id))
    }

    pub fn edit_group(&mut self, edit: GroupEdit) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, shots| engine::edit_group(tx, shots, edit))
    }

    pub fn approve_connection(&mut self, a: &ShotId, b: &ShotId) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, shots| engine::approve_connection(tx, shots, a, b))
    }

    pub fn decline_connection(&mut self, a: &ShotId, b: &ShotId) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, shots| engine::decline_connection(tx, shots, a, b))
    }

    pub fn apply_breakdown(
        &mut self,
        drafts: Vec<ContinuityGroupDraft>,
    ) -> ContinuityResult<EditOutcome> {
        self.mutate(|tx, shots| engine::apply_breakdown(tx, shots, drafts))
    }

    /// Seed groups from legacy link flags.
    ///
    /// The legacy shots also replace the scene's shot index, and existing
    /// groups are re-validated against it in the same transaction.
    pub fn migrate_legacy_links(
        &mut self,
        shots: &[LegacyShot],
        mode: MigrationMode,
    ) -> ContinuityResult<EditOutcome> {
        self.lock.ensure_unlocked(&self.scene_id)?;
        let index = ShotIndex::new(&self.scene_id, shots.iter().map(LegacyShot::to_shot));
        let mut tx = self.groups.begin();
        engine::revalidate(&mut tx, &index);
        let outcome = engine::migrate_legacy_links(&mut tx, &index, shots, mode)?;
        self.shots = index;
        self.groups.commit(tx);
        Ok(outcome)
    }

    pub fn lock(&mut self) -> ContinuityResult<()> {
        self.lock.lock(&self.groups)
    }

    pub fn unlock(&mut self) {
        self.lock.unlock();
    }

    /// Replace the shot index and re-validate every group against it.
    ///
    /// Not gated by the lock. Returns the number of groups that changed.
    pub fn sync_shots(&mut self, video_id: VideoId, shots: Vec<Shot>) -> usize {
        self.video_id = video_id;
        self.shots = ShotIndex::new(&self.scene_id, shots);
        let mut tx = self.groups.begin();
        let changed = engine::revalidate(&mut tx, &self.shots);
        if changed > 0 {
            self.groups.commit(tx);
        }
        changed
    }

    /// Load persisted groups, re-validated against the current shots.
    ///
    /// `locked` is honoured only if an approved group survives.
    pub fn hydrate(&mut self, groups: Vec<ContinuityGroup>, locked: bool) -> usize {
        let scene_id = self.scene_id.clone();
        self.groups
            .replace_all(groups.into_iter().filter(|g| g.scene_id == scene_id));

        let mut tx = self.groups.begin();
        let dropped = engine::revalidate(&mut tx, &self.shots);
        self.groups.commit(tx);

        self.lock.unlock();
        if locked {
            // Ignored when nothing approved survived re-validation.
            let _ = self.lock.lock(&self.groups);
        }
        dropped
    }

    pub fn connections(&self) -> Vec<Connection> {
        derive_connections(
            &self.shots,
            self.groups.partition(GroupStatus::Approved),
            self.groups.partition(GroupStatus::Proposed),
        )
    }

    pub fn merged_groups(&self) -> Vec<ContinuityGroup> {
        self.groups.merged()
    }

    pub fn view(&self) -> SceneView {
        SceneView {
            scene_id: self.scene_id.clone(),
            video_id: self.video_id.clone(),
            locked: self.lock.is_locked(),
            groups: self.merged_groups(),
            connections: self.connections(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContinuityError;
    use shotline_models::ConnectionStatus;

    fn scene(n: u32) -> SceneContinuity {
        let mut scene = SceneContinuity::new("v1".into(), "sc".into());
        scene.sync_shots(
            "v1".into(),
            (0..n).map(|i| Shot::new(format!("S{}", i + 1), "sc", i)).collect(),
        );
        scene
    }

    fn breakdown(scene: &mut SceneContinuity, runs: &[&[&str]]) {
        let drafts = runs
            .iter()
            .map(|run| ContinuityGroupDraft::new(run.iter().map(|s| ShotId::from(*s)).collect()))
            .collect();
        scene.apply_breakdown(drafts).unwrap();
    }

    #[test]
    fn test_view_reports_derived_connections() {
        let mut scene = scene(4);
        breakdown(&mut scene, &[&["S1", "S2", "S3", "S4"]]);
        scene
            .approve_connection(&"S1".into(), &"S2".into())
            .unwrap();

        let view = scene.view();
        assert_eq!(view.connections.len(), 3);
        assert_eq!(view.connections[0].status, ConnectionStatus::Approved);
        assert_eq!(view.connections[1].status, ConnectionStatus::Proposed);
        assert_eq!(view.groups_with_status(GroupStatus::Approved).count(), 1);
    }

    #[test]
    fn test_locked_scene_rejects_edits_but_accepts_shots() {
        let mut scene = scene(3);
        breakdown(&mut scene, &[&["S1", "S2", "S3"]]);
        assert!(matches!(scene.lock(), Err(ContinuityError::NoApprovedGroups(_))));

        let id = scene.groups().partition(GroupStatus::Proposed).next().unwrap().id.clone();
        scene.approve_group(&id).unwrap();
        scene.lock().unwrap();

        let before = scene.merged_groups();
        let err = scene.decline_group(&id).unwrap_err();
        assert_eq!(err, ContinuityError::Locked("sc".into()));
        assert_eq!(scene.merged_groups(), before);

        // Deleting S3 is still applied
        let changed = scene.sync_shots(
            "v1".into(),
            vec![Shot::new("S1", "sc", 0), Shot::new("S2", "sc", 1)],
        );
        assert_eq!(changed, 1);
        assert_eq!(scene.merged_groups()[0].shot_ids.len(), 2);
        assert!(scene.is_locked());
    }

    #[test]
    fn test_failed_edit_leaves_scene_untouched() {
        let mut scene = scene(3);
        breakdown(&mut scene, &[&["S1", "S2", "S3"]]);
        let before = scene.merged_groups();

        assert!(scene.approve_connection(&"S1".into(), &"S3".into()).is_err());
        assert!(scene.approve_group(&GroupId::from("missing")).is_err());
        assert_eq!(scene.merged_groups(), before);
    }

    #[test]
    fn test_migrate_replaces_shot_index() {
        let mut scene = SceneContinuity::new("v1".into(), "sc".into());
        let shots = vec![
            LegacyShot::new("S1", "sc", 0, false),
            LegacyShot::new("S2", "sc", 1, true),
            LegacyShot::new("S3", "sc", 2, true),
            LegacyShot::new("S4", "sc", 3, false),
        ];
        scene
            .migrate_legacy_links(&shots, MigrationMode::Committed)
            .unwrap();

        assert_eq!(scene.shots().len(), 4);
        assert_eq!(scene.groups().count(GroupStatus::Approved), 2);
        assert_eq!(scene.connections().len(), 2);
    }

    #[test]
    fn test_hydrate_revalidates_and_restores_lock() {
        let mut scene = scene(3);
        let groups = vec![
            ContinuityGroup::new("sc", 1, vec!["S1".into(), "S2".into()], GroupStatus::Approved),
            ContinuityGroup::new("sc", 2, vec!["S2".into(), "S9".into()], GroupStatus::Proposed),
            ContinuityGroup::new("other", 3, vec!["S1".into(), "S2".into()], GroupStatus::Proposed),
        ];

        scene.hydrate(groups, true);

        assert_eq!(scene.groups().len(), 1);
        assert!(scene.is_locked());
    }
}
