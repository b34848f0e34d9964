//! API routes.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::continuity::{
    apply_breakdown, approve_connection, approve_group, decline_connection, decline_group,
    edit_group, get_continuity, lock_scene, migrate_legacy_links, reload_continuity, sync_shots,
    unlock_scene,
};
use crate::handlers::health;
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let scene_routes = Router::new()
        .route("/scenes/:scene_id/shots", put(sync_shots))
        .route("/scenes/:scene_id/continuity", get(get_continuity))
        .route("/scenes/:scene_id/continuity/breakdown", post(apply_breakdown))
        .route("/scenes/:scene_id/continuity/migrate", post(migrate_legacy_links))
        .route("/scenes/:scene_id/lock", post(lock_scene).delete(unlock_scene));

    let group_routes = Router::new()
        .route("/scenes/:scene_id/groups/:group_id", put(edit_group))
        .route("/scenes/:scene_id/groups/:group_id/approve", post(approve_group))
        .route("/scenes/:scene_id/groups/:group_id/decline", post(decline_group));

    let connection_routes = Router::new()
        .route("/scenes/:scene_id/connections/approve", post(approve_connection))
        .route("/scenes/:scene_id/connections/decline", post(decline_connection));

    let video_routes = Router::new()
        .route("/videos/:video_id/continuity/reload", post(reload_continuity));

    let api_routes = Router::new()
        .merge(scene_routes)
        .merge(group_routes)
        .merge(connection_routes)
        .merge(video_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
