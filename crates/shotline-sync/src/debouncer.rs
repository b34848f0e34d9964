//! Debounced save worker.
//!
//! Change notifications are coalesced per video: each notification pushes the
//! video's save deadline to `now + debounce`, and when a deadline passes the
//! latest snapshot is saved. A failed save is re-scheduled, never dropped.
//! When every [`SyncHandle`] is gone the worker saves whatever is pending and
//! exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use shotline_continuity::ContinuityStore;
use shotline_models::{ContinuityDocument, VideoId};

use crate::metrics::{record_save, set_pending_videos};
use crate::persistence::ContinuityPersistence;

/// Parks the timer branch while nothing is pending.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Quiet period after the last change before a save
    pub debounce: Duration,
    /// Delay before saving again after a failed save
    pub reschedule: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            reschedule: Duration::from_millis(5000),
        }
    }
}

impl DebounceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debounce_ms: u64 = std::env::var("CONTINUITY_SYNC_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500);

        let reschedule_ms: u64 = std::env::var("CONTINUITY_SYNC_RESCHEDULE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        Self {
            debounce: Duration::from_millis(debounce_ms),
            reschedule: Duration::from_millis(reschedule_ms),
        }
    }
}

// =============================================================================
// Snapshot source
// =============================================================================

/// Where the worker reads the latest state of a video from.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self, video_id: &VideoId) -> Option<ContinuityDocument>;
}

impl SnapshotSource for ContinuityStore {
    fn snapshot(&self, video_id: &VideoId) -> Option<ContinuityDocument> {
        self.video_document(video_id)
    }
}

// =============================================================================
// Handle and worker
// =============================================================================

/// Cheap, cloneable sender of change notifications.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<VideoId>,
}

impl SyncHandle {
    /// Schedule a save of the video's latest state.
    pub fn notify(&self, video_id: &VideoId) {
        if self.tx.send(video_id.clone()).is_err() {
            warn!(video_id = %video_id, "Sync worker has stopped, change not scheduled");
        }
    }
}

pub struct SyncWorker {
    source: Arc<dyn SnapshotSource>,
    persistence: Arc<dyn ContinuityPersistence>,
    config: DebounceConfig,
}

impl SyncWorker {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        persistence: Arc<dyn ContinuityPersistence>,
        config: DebounceConfig,
    ) -> Self {
        Self {
            source,
            persistence,
            config,
        }
    }

    /// Start the worker on the current runtime.
    pub fn spawn(self) -> (SyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (SyncHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<VideoId>) {
        info!(
            debounce_ms = self.config.debounce.as_millis() as u64,
            reschedule_ms = self.config.reschedule.as_millis() as u64,
            "Continuity sync worker started"
        );

        let mut pending: HashMap<VideoId, Instant> = HashMap::new();

        loop {
            let next = pending.values().min().copied();
            let deadline = next.unwrap_or_else(|| Instant::now() + IDLE_WAIT);

            tokio::select! {
                message = rx.recv() => match message {
                    Some(video_id) => {
                        pending.insert(video_id, Instant::now() + self.config.debounce);
                        set_pending_videos(pending.len());
                    }
                    None => break,
                },
                _ = sleep_until(deadline), if next.is_some() => {
                    self.save_due(&mut pending).await;
                    set_pending_videos(pending.len());
                }
            }
        }

        self.flush(pending).await;
        set_pending_videos(0);
        info!("Continuity sync worker stopped");
    }

    async fn save_due(&self, pending: &mut HashMap<VideoId, Instant>) {
        let now = Instant::now();
        let due: Vec<VideoId> = pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(video_id, _)| video_id.clone())
            .collect();

        for video_id in due {
            pending.remove(&video_id);
            if !self.save(&video_id).await {
                // A newer notification keeps its own, earlier deadline.
                pending
                    .entry(video_id)
                    .or_insert_with(|| Instant::now() + self.config.reschedule);
            }
        }
    }

    async fn flush(&self, pending: HashMap<VideoId, Instant>) {
        for video_id in pending.into_keys() {
            if !self.save(&video_id).await {
                warn!(video_id = %video_id, "Continuity changes not saved before shutdown");
            }
        }
    }

    /// Save the latest snapshot. Returns false if it must be tried again.
    async fn save(&self, video_id: &VideoId) -> bool {
        let Some(document) = self.source.snapshot(video_id) else {
            debug!(video_id = %video_id, "No scenes left for video, skipping save");
            return true;
        };

        match self.persistence.save(video_id, &document).await {
            Ok(()) => {
                record_save("ok");
                debug!(
                    video_id = %video_id,
                    groups = document.group_count(),
                    locked = document.locked,
                    "Continuity synced"
                );
                true
            }
            Err(e) => {
                record_save("failed");
                warn!(
                    video_id = %video_id,
                    error = %e,
                    reschedule_ms = self.config.reschedule.as_millis() as u64,
                    "Continuity save failed, rescheduling"
                );
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
