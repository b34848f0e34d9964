//! Shared data models for shot continuity.
//!
//! This crate provides Serde-serializable types for:
//! - Shot, scene, group and video identifiers
//! - Shots and legacy linked shots
//! - Continuity groups, AI drafts and derived connections
//! - Persisted continuity documents and their load-time migration

pub mod connection;
pub mod group;
pub mod ids;
pub mod record;
pub mod shot;

// Re-export common types
pub use connection::{Connection, ConnectionStatus};
pub use group::{ContinuityGroup, ContinuityGroupDraft, GroupStatus};
pub use ids::{GroupId, SceneId, ShotId, VideoId};
pub use record::{migrate_record, ContinuityDocument, GroupRecord, StoredContinuityDocument};
pub use shot::{LegacyShot, Shot};
