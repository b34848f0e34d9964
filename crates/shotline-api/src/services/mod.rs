//! Business logic services.

pub mod continuity;

pub use continuity::{ContinuityService, MutationResponse, ReloadResponse};
