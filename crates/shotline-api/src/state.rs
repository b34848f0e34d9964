//! Application state.

use std::sync::Arc;

use shotline_continuity::ContinuityStore;
use shotline_sync::{ContinuityPersistence, SyncHandle};

use crate::config::ApiConfig;
use crate::services::ContinuityService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub continuity: ContinuityService,
}

impl AppState {
    /// Create state with persistence disabled.
    pub fn new(config: ApiConfig, store: Arc<ContinuityStore>) -> Self {
        Self {
            config,
            continuity: ContinuityService::new(store),
        }
    }

    /// Save applied edits through the sync worker.
    pub fn with_persistence(
        mut self,
        sync: SyncHandle,
        persistence: Arc<dyn ContinuityPersistence>,
    ) -> Self {
        self.continuity = self.continuity.with_persistence(sync, persistence);
        self
    }
}
