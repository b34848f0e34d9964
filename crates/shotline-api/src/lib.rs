//! Axum HTTP API over the continuity engine.
//!
//! This crate provides:
//! - Per-scene continuity endpoints (shots, groups, connections, lock)
//! - Debounced persistence of applied edits
//! - Security headers, request ids and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::ContinuityService;
pub use state::AppState;
