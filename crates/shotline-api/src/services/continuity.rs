//! Continuity service.
//!
//! Runs store operations for the handlers, schedules a save after every
//! applied edit and turns rejected connection edits into a no-op answer.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use shotline_continuity::{
    ContinuityError, ContinuityResult, ContinuityStore, GroupEdit, MigrationMode, Mutation,
    SceneView,
};
use shotline_models::{
    ContinuityGroupDraft, GroupId, LegacyShot, SceneId, Shot, ShotId, VideoId,
};
use shotline_sync::{ContinuityPersistence, SyncHandle};

use crate::error::{ApiError, ApiResult};

/// Scene view after an operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// False when the operation left the scene as it was
    pub applied: bool,
    pub view: SceneView,
}

/// Result of reloading a video from persistence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub video_id: VideoId,
    /// Whether a document was stored for the video
    pub found: bool,
    pub scenes: Vec<SceneId>,
}

#[derive(Clone)]
pub struct ContinuityService {
    store: Arc<ContinuityStore>,
    sync: Option<SyncHandle>,
    persistence: Option<Arc<dyn ContinuityPersistence>>,
}

impl ContinuityService {
    /// Service without persistence.
    pub fn new(store: Arc<ContinuityStore>) -> Self {
        Self {
            store,
            sync: None,
            persistence: None,
        }
    }

    /// Attach the sync worker handle and the persistence it writes to.
    pub fn with_persistence(
        mut self,
        sync: SyncHandle,
        persistence: Arc<dyn ContinuityPersistence>,
    ) -> Self {
        self.sync = Some(sync);
        self.persistence = Some(persistence);
        self
    }

    pub fn store(&self) -> &Arc<ContinuityStore> {
        &self.store
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence.is_some()
    }

    fn respond(&self, mutation: Mutation) -> MutationResponse {
        if mutation.is_applied() {
            if let Some(sync) = &self.sync {
                sync.notify(&mutation.video_id);
            }
        }
        MutationResponse {
            applied: mutation.is_applied(),
            view: mutation.view,
        }
    }

    /// Map an edit result, answering a rejected connection with the current view.
    fn finish(
        &self,
        scene_id: &SceneId,
        result: ContinuityResult<Mutation>,
    ) -> ApiResult<MutationResponse> {
        match result {
            Ok(mutation) => Ok(self.respond(mutation)),
            Err(ContinuityError::InvalidConnection { .. }) => Ok(MutationResponse {
                applied: false,
                view: self.store.view(scene_id)?,
            }),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub fn sync_shots(
        &self,
        video_id: VideoId,
        scene_id: SceneId,
        shots: Vec<Shot>,
    ) -> ApiResult<MutationResponse> {
        if let Some(stray) = shots.iter().find(|s| s.scene_id != scene_id) {
            return Err(ApiError::bad_request(format!(
                "Shot {} belongs to scene {}",
                stray.id, stray.scene_id
            )));
        }
        Ok(self.respond(self.store.sync_shots(video_id, scene_id, shots)))
    }

    pub fn view(&self, scene_id: &SceneId) -> ApiResult<SceneView> {
        Ok(self.store.view(scene_id)?)
    }

    pub fn apply_breakdown(
        &self,
        scene_id: &SceneId,
        drafts: Vec<ContinuityGroupDraft>,
    ) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.apply_breakdown(scene_id, drafts))
    }

    pub fn migrate_legacy_links(
        &self,
        video_id: &VideoId,
        scene_id: &SceneId,
        shots: &[LegacyShot],
        mode: MigrationMode,
    ) -> ApiResult<MutationResponse> {
        if let Some(stray) = shots.iter().find(|s| &s.scene_id != scene_id) {
            return Err(ApiError::bad_request(format!(
                "Shot {} belongs to scene {}",
                stray.id, stray.scene_id
            )));
        }
        let result = self
            .store
            .migrate_legacy_links(video_id, scene_id, shots, mode);
        self.finish(scene_id, result)
    }

    pub fn approve_group(&self, scene_id: &SceneId, group_id: &GroupId) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.approve_group(scene_id, group_id))
    }

    pub fn decline_group(&self, scene_id: &SceneId, group_id: &GroupId) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.decline_group(scene_id, group_id))
    }

    pub fn edit_group(&self, scene_id: &SceneId, edit: GroupEdit) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.edit_group(scene_id, edit))
    }

    pub fn approve_connection(
        &self,
        scene_id: &SceneId,
        shot_a: &ShotId,
        shot_b: &ShotId,
    ) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.approve_connection(scene_id, shot_a, shot_b))
    }

    pub fn decline_connection(
        &self,
        scene_id: &SceneId,
        shot_a: &ShotId,
        shot_b: &ShotId,
    ) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.decline_connection(scene_id, shot_a, shot_b))
    }

    pub fn lock(&self, scene_id: &SceneId) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.lock(scene_id))
    }

    pub fn unlock(&self, scene_id: &SceneId) -> ApiResult<MutationResponse> {
        self.finish(scene_id, self.store.unlock(scene_id))
    }

    /// Replace the video's registered scenes with the persisted document.
    pub async fn reload(&self, video_id: &VideoId) -> ApiResult<ReloadResponse> {
        let persistence = self
            .persistence
            .as_ref()
            .ok_or_else(|| ApiError::unavailable("Continuity persistence is not configured"))?;

        let document = persistence.load(video_id).await.inspect_err(|e| {
            warn!(video_id = %video_id, error = %e, "Failed to load continuity");
        })?;

        let Some(document) = document else {
            info!(video_id = %video_id, "No stored continuity for video");
            return Ok(ReloadResponse {
                video_id: video_id.clone(),
                found: false,
                scenes: Vec::new(),
            });
        };

        let scenes = self.store.hydrate(video_id, document);
        Ok(ReloadResponse {
            video_id: video_id.clone(),
            found: true,
            scenes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_scene() -> ContinuityService {
        let service = ContinuityService::new(Arc::new(ContinuityStore::new()));
        let shots = (0..3).map(|i| Shot::new(format!("s{}", i), "sc1", i)).collect();
        service
            .sync_shots("v1".into(), "sc1".into(), shots)
            .unwrap();
        service
    }

    #[test]
    fn test_invalid_connection_answers_current_view() {
        let service = service_with_scene();
        let scene = SceneId::from("sc1");
        service
            .apply_breakdown(
                &scene,
                vec![ContinuityGroupDraft::new(vec!["s0".into(), "s1".into(), "s2".into()])],
            )
            .unwrap();

        let response = service
            .approve_connection(&scene, &"s0".into(), &"s2".into())
            .unwrap();

        assert!(!response.applied);
        assert_eq!(response.view, service.view(&scene).unwrap());
    }

    #[test]
    fn test_other_errors_are_returned() {
        let service = service_with_scene();
        let result = service.approve_group(&"sc1".into(), &"missing".into());
        assert!(matches!(
            result,
            Err(ApiError::Continuity(ContinuityError::GroupNotFound { .. }))
        ));
    }

    #[test]
    fn test_reload_requires_persistence() {
        let service = service_with_scene();
        assert!(!service.persistence_enabled());

        let result = tokio_test::block_on(service.reload(&"v1".into()));
        assert!(matches!(result, Err(ApiError::Unavailable(_))));
    }
}
