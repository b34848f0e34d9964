//! Persistence seam used by the debouncer and the reload endpoint.

use async_trait::async_trait;

use shotline_models::{ContinuityDocument, VideoId};

use crate::error::SyncResult;

/// Storage for per-video continuity documents.
#[async_trait]
pub trait ContinuityPersistence: Send + Sync {
    /// Overwrite the video's document.
    async fn save(&self, video_id: &VideoId, document: &ContinuityDocument) -> SyncResult<()>;

    /// Load and migrate the video's document, if one was ever saved.
    async fn load(&self, video_id: &VideoId) -> SyncResult<Option<ContinuityDocument>>;
}
