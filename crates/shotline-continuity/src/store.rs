//! Concurrent registry of scenes.
//!
//! Each scene sits behind its own mutex, so edits to different scenes run in
//! parallel while edits to one scene are serialized. The map guard is always
//! released before a scene mutex is taken.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shotline_models::{
    ContinuityDocument, ContinuityGroupDraft, GroupId, LegacyShot, SceneId, Shot, ShotId,
    VideoId,
};

use crate::engine::{EditOutcome, GroupEdit, MigrationMode};
use crate::error::{ContinuityError, ContinuityResult};
use crate::metrics;
use crate::scene::{SceneContinuity, SceneView};

type SceneCell = Arc<Mutex<SceneContinuity>>;

/// Result of a successful store operation.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub outcome: EditOutcome,
    /// Video the scene belongs to, for sync notification
    pub video_id: VideoId,
    pub view: SceneView,
}

impl Mutation {
    pub fn is_applied(&self) -> bool {
        self.outcome.is_applied()
    }
}

/// All scenes known to this process.
#[derive(Debug, Default)]
pub struct ContinuityStore {
    scenes: DashMap<SceneId, SceneCell>,
}

impl ContinuityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn contains(&self, scene_id: &SceneId) -> bool {
        self.scenes.contains_key(scene_id)
    }

    fn cell(&self, scene_id: &SceneId) -> ContinuityResult<SceneCell> {
        self.scenes
            .get(scene_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ContinuityError::SceneNotFound(scene_id.clone()))
    }

    fn cell_or_register(&self, video_id: &VideoId, scene_id: &SceneId) -> SceneCell {
        let entry = self.scenes.entry(scene_id.clone()).or_insert_with(|| {
            debug!(scene_id = %scene_id, video_id = %video_id, "Registered scene");
            Arc::new(Mutex::new(SceneContinuity::new(video_id.clone(), scene_id.clone())))
        });
        Arc::clone(entry.value())
    }

    /// Run one edit on a registered scene, with logging and metrics.
    fn run<F>(&self, operation: &'static str, scene_id: &SceneId, f: F) -> ContinuityResult<Mutation>
    where
        F: FnOnce(&mut SceneContinuity) -> ContinuityResult<EditOutcome>,
    {
        let cell = self.cell(scene_id).inspect_err(|e| {
            metrics::record_operation(operation, e.code());
        })?;
        let mut scene = cell.lock();

        match f(&mut scene) {
            Ok(outcome) => {
                let label = match outcome {
                    EditOutcome::Applied => "applied",
                    EditOutcome::Unchanged => "unchanged",
                };
                metrics::record_operation(operation, label);
                info!(
                    scene_id = %scene_id,
                    video_id = %scene.video_id(),
                    operation,
                    outcome = label,
                    "Continuity operation completed"
                );
                Ok(Mutation {
                    outcome,
                    video_id: scene.video_id().clone(),
                    view: scene.view(),
                })
            }
            Err(e) => {
                metrics::record_operation(operation, e.code());
                match &e {
                    ContinuityError::InvalidConnection { .. } => {
                        warn!(scene_id = %scene_id, operation, error = %e, "Rejected connection edit")
                    }
                    _ => debug!(scene_id = %scene_id, operation, error = %e, "Continuity operation failed"),
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Shots
    // =========================================================================

    /// Register or refresh a scene's shots and re-validate its groups.
    pub fn sync_shots(&self, video_id: VideoId, scene_id: SceneId, shots: Vec<Shot>) -> Mutation {
        let cell = self.cell_or_register(&video_id, &scene_id);
        let mut scene = cell.lock();
        let changed = scene.sync_shots(video_id, shots);

        metrics::record_operation("sync_shots", "applied");
        metrics::record_revalidated(changed);
        if changed > 0 {
            info!(
                scene_id = %scene_id,
                video_id = %scene.video_id(),
                changed,
                "Re-validated groups after shot change"
            );
        }

        Mutation {
            outcome: EditOutcome::Applied,
            video_id: scene.video_id().clone(),
            view: scene.view(),
        }
    }

    // =========================================================================
    // Edits
    // =========================================================================

    pub fn approve_group(&self, scene_id: &SceneId, group_id: &GroupId) -> ContinuityResult<Mutation> {
        self.run("approve_group", scene_id, |scene| scene.approve_group(group_id))
    }

    pub fn decline_group(&self, scene_id: &SceneId, group_id: &GroupId) -> ContinuityResult<Mutation> {
        self.run("decline_group", scene_id, |scene| scene.decline_group(group_id))
    }

    pub fn edit_group(&self, scene_id: &SceneId, edit: GroupEdit) -> ContinuityResult<Mutation> {
        self.run("edit_group", scene_id, |scene| scene.edit_group(edit))
    }

    pub fn approve_connection(
        &self,
        scene_id: &SceneId,
        a: &ShotId,
        b: &ShotId,
    ) -> ContinuityResult<Mutation> {
        self.run("approve_connection", scene_id, |scene| scene.approve_connection(a, b))
    }

    pub fn decline_connection(
        &self,
        scene_id: &SceneId,
        a: &ShotId,
        b: &ShotId,
    ) -> ContinuityResult<Mutation> {
        self.run("decline_connection", scene_id, |scene| scene.decline_connection(a, b))
    }

    pub fn apply_breakdown(
        &self,
        scene_id: &SceneId,
        drafts: Vec<ContinuityGroupDraft>,
    ) -> ContinuityResult<Mutation> {
        self.run("apply_breakdown", scene_id, |scene| scene.apply_breakdown(drafts))
    }

    /// Migrate legacy link flags, registering the scene if needed.
    pub fn migrate_legacy_links(
        &self,
        video_id: &VideoId,
        scene_id: &SceneId,
        shots: &[LegacyShot],
        mode: MigrationMode,
    ) -> ContinuityResult<Mutation> {
        self.cell_or_register(video_id, scene_id);
        self.run("migrate_legacy_links", scene_id, |scene| {
            scene.migrate_legacy_links(shots, mode)
        })
    }

    pub fn lock(&self, scene_id: &SceneId) -> ContinuityResult<Mutation> {
        self.run("lock", scene_id, |scene| {
            // Shot syncs may empty the approved partition of a locked scene,
            // so the approved count is checked on every call.
            let was_locked = scene.is_locked();
            scene.lock()?;
            Ok(if was_locked {
                EditOutcome::Unchanged
            } else {
                EditOutcome::Applied
            })
        })
    }

    pub fn unlock(&self, scene_id: &SceneId) -> ContinuityResult<Mutation> {
        self.run("unlock", scene_id, |scene| {
            if !scene.is_locked() {
                return Ok(EditOutcome::Unchanged);
            }
            scene.unlock();
            Ok(EditOutcome::Applied)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn view(&self, scene_id: &SceneId) -> ContinuityResult<SceneView> {
        let cell = self.cell(scene_id)?;
        let scene = cell.lock();
        Ok(scene.view())
    }

    fn cells_for_video(&self, video_id: &VideoId) -> Vec<SceneCell> {
        let cells: Vec<SceneCell> = self
            .scenes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        cells
            .into_iter()
            .filter(|cell| cell.lock().video_id() == video_id)
            .collect()
    }

    pub fn scene_ids_for_video(&self, video_id: &VideoId) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self
            .cells_for_video(video_id)
            .iter()
            .map(|cell| cell.lock().scene_id().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of every scene of a video, in the persisted document shape.
    ///
    /// `locked` is true only if every scene of the video is locked.
    pub fn video_document(&self, video_id: &VideoId) -> Option<ContinuityDocument> {
        let cells = self.cells_for_video(video_id);
        if cells.is_empty() {
            return None;
        }

        let mut continuity_groups = BTreeMap::new();
        let mut locked = true;
        for cell in cells {
            let scene = cell.lock();
            locked &= scene.is_locked();
            continuity_groups.insert(scene.scene_id().clone(), scene.merged_groups());
        }

        Some(ContinuityDocument {
            continuity_groups,
            locked,
        })
    }

    /// Apply a loaded document to the video's registered scenes.
    ///
    /// Scenes in the document that have not been registered through
    /// [`ContinuityStore::sync_shots`] are skipped, since their groups cannot
    /// be validated. Returns the hydrated scene ids.
    pub fn hydrate(&self, video_id: &VideoId, document: ContinuityDocument) -> Vec<SceneId> {
        let locked = document.locked;
        let mut hydrated = Vec::new();

        for (scene_id, groups) in document.continuity_groups {
            let Ok(cell) = self.cell(&scene_id) else {
                debug!(scene_id = %scene_id, video_id = %video_id, "Skipping unregistered scene");
                continue;
            };
            let mut scene = cell.lock();
            if scene.video_id() != video_id {
                warn!(
                    scene_id = %scene_id,
                    video_id = %video_id,
                    owner = %scene.video_id(),
                    "Skipping scene owned by another video"
                );
                continue;
            }
            let changed = scene.hydrate(groups, locked);
            metrics::record_revalidated(changed);
            hydrated.push(scene_id);
        }

        info!(video_id = %video_id, scenes = hydrated.len(), "Hydrated continuity");
        hydrated
    }
}
