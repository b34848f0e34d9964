//! Continuity group engine.
//!
//! Tracks, per scene, which consecutive shots are linked into continuity
//! groups and in which approval state, and applies approve/decline edits
//! that split and merge multi-shot chains.
//!
//! - [`shot_index`]: ordered, read-only view of a scene's shots
//! - [`repository`]: group arena, partitions and transactions
//! - [`derivation`]: live connections for the renderer
//! - [`engine`]: the edit operations
//! - [`lock`]: scene freeze
//! - [`scene`] and [`store`]: per-scene state and the concurrent registry

pub mod derivation;
pub mod engine;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod repository;
pub mod scene;
pub mod shot_index;
pub mod store;

pub use derivation::derive_connections;
pub use engine::{EditOutcome, GroupEdit, MigrationMode};
pub use error::{ContinuityError, ContinuityResult};
pub use lock::LockState;
pub use repository::{GroupRepository, Transaction};
pub use scene::{SceneContinuity, SceneView};
pub use shot_index::ShotIndex;
pub use store::{ContinuityStore, Mutation};
