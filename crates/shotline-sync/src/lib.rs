//! Continuity persistence and sync.
//!
//! This crate provides:
//! - An HTTP client for `{base}/scenes/{videoId}/continuity`
//! - Retried saves and loads with jittered backoff and a Retry-After cap
//! - A debounced worker that coalesces edits per video and never drops them

pub mod client;
pub mod debouncer;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod retry;

pub use client::{HttpContinuityClient, SyncConfig};
pub use debouncer::{DebounceConfig, SnapshotSource, SyncHandle, SyncWorker};
pub use error::{SyncError, SyncResult};
pub use persistence::ContinuityPersistence;
pub use retry::{retry_persistence, Backoff, PersistCall, RetryConfig};
