//! Continuity handlers.
//!
//! Every mutating endpoint answers with the scene view after the operation.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use shotline_continuity::{GroupEdit, MigrationMode, SceneView};
use shotline_models::{
    ContinuityGroupDraft, GroupId, GroupStatus, LegacyShot, SceneId, Shot, ShotId, VideoId,
};

use crate::error::ApiResult;
use crate::services::{MutationResponse, ReloadResponse};
use crate::state::AppState;

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncShotsRequest {
    #[validate(length(min = 1, max = 256))]
    pub video_id: String,

    #[validate(length(max = 2000))]
    pub shots: Vec<Shot>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRequest {
    #[validate(length(max = 2000))]
    pub drafts: Vec<ContinuityGroupDraft>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MigrateRequest {
    #[validate(length(min = 1, max = 256))]
    pub video_id: String,

    #[validate(length(max = 2000))]
    pub shots: Vec<LegacyShot>,

    pub mode: MigrationMode,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[validate(length(min = 1, max = 256))]
    pub shot_a: String,

    #[validate(length(min = 1, max = 256))]
    pub shot_b: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditGroupRequest {
    /// Partition the group is expected in
    pub status: GroupStatus,

    #[validate(length(min = 2, max = 2000))]
    pub shot_ids: Vec<ShotId>,

    #[serde(default)]
    #[validate(length(max = 200))]
    pub transition_type: Option<String>,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(length(max = 256))]
    pub edited_by: Option<String>,
}

// =============================================================================
// Shots and views
// =============================================================================

/// Push the scene's current shot sequence.
pub async fn sync_shots(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
    Json(request): Json<SyncShotsRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let response = state.continuity.sync_shots(
        VideoId::from(request.video_id),
        scene_id,
        request.shots,
    )?;
    Ok(Json(response))
}

pub async fn get_continuity(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
) -> ApiResult<Json<SceneView>> {
    Ok(Json(state.continuity.view(&scene_id)?))
}

// =============================================================================
// Bulk replacement
// =============================================================================

/// Replace proposed groups with AI breakdown drafts.
pub async fn apply_breakdown(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
    Json(request): Json<BreakdownRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;
    Ok(Json(state.continuity.apply_breakdown(&scene_id, request.drafts)?))
}

/// Convert legacy `isLinkedToPrevious` flags into groups.
pub async fn migrate_legacy_links(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
    Json(request): Json<MigrateRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let video_id = VideoId::from(request.video_id);
    let response =
        state
            .continuity
            .migrate_legacy_links(&video_id, &scene_id, &request.shots, request.mode)?;
    Ok(Json(response))
}

// =============================================================================
// Groups
// =============================================================================

pub async fn approve_group(
    State(state): State<AppState>,
    Path((scene_id, group_id)): Path<(SceneId, GroupId)>,
) -> ApiResult<Json<MutationResponse>> {
    Ok(Json(state.continuity.approve_group(&scene_id, &group_id)?))
}

pub async fn decline_group(
    State(state): State<AppState>,
    Path((scene_id, group_id)): Path<(SceneId, GroupId)>,
) -> ApiResult<Json<MutationResponse>> {
    Ok(Json(state.continuity.decline_group(&scene_id, &group_id)?))
}

pub async fn edit_group(
    State(state): State<AppState>,
    Path((scene_id, group_id)): Path<(SceneId, GroupId)>,
    Json(request): Json<EditGroupRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let edit = GroupEdit {
        id: group_id,
        status: request.status,
        shot_ids: request.shot_ids,
        transition_type: request.transition_type,
        description: request.description,
        edited_by: request.edited_by,
    };
    Ok(Json(state.continuity.edit_group(&scene_id, edit)?))
}

// =============================================================================
// Connections
// =============================================================================

pub async fn approve_connection(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
    Json(request): Json<ConnectionRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let (a, b) = (ShotId::from(request.shot_a), ShotId::from(request.shot_b));
    Ok(Json(state.continuity.approve_connection(&scene_id, &a, &b)?))
}

pub async fn decline_connection(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
    Json(request): Json<ConnectionRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let (a, b) = (ShotId::from(request.shot_a), ShotId::from(request.shot_b));
    Ok(Json(state.continuity.decline_connection(&scene_id, &a, &b)?))
}

// =============================================================================
// Lock
// =============================================================================

pub async fn lock_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
) -> ApiResult<Json<MutationResponse>> {
    Ok(Json(state.continuity.lock(&scene_id)?))
}

pub async fn unlock_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<SceneId>,
) -> ApiResult<Json<MutationResponse>> {
    Ok(Json(state.continuity.unlock(&scene_id)?))
}

// =============================================================================
// Persistence
// =============================================================================

/// Load the video's stored continuity into its registered scenes.
pub async fn reload_continuity(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
) -> ApiResult<Json<ReloadResponse>> {
    Ok(Json(state.continuity.reload(&video_id).await?))
}
