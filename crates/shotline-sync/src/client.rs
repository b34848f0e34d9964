//! HTTP client for the continuity persistence service.
//!
//! - HTTP client tuning (pooling, timeouts)
//! - Optional bearer token
//! - Retried saves and loads (see [`crate::retry`])
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info_span, Instrument};

use shotline_models::{ContinuityDocument, StoredContinuityDocument, VideoId};

use crate::error::{SyncError, SyncResult};
use crate::metrics::record_request;
use crate::persistence::ContinuityPersistence;
use crate::retry::{retry_persistence, PersistCall, RetryConfig};

// =============================================================================
// Configuration
// =============================================================================

/// Persistence client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the persistence service
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// Fails when `CONTINUITY_SYNC_URL` is unset or empty.
    pub fn from_env() -> SyncResult<Self> {
        let base_url = std::env::var("CONTINUITY_SYNC_URL")
            .map_err(|_| SyncError::config("CONTINUITY_SYNC_URL must be set to enable persistence"))?;

        if base_url.trim().is_empty() {
            return Err(SyncError::config("CONTINUITY_SYNC_URL cannot be empty"));
        }

        let timeout_secs: u64 = std::env::var("CONTINUITY_SYNC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let connect_timeout_secs: u64 = std::env::var("CONTINUITY_SYNC_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url,
            token: std::env::var("CONTINUITY_SYNC_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// REST client for `{base}/scenes/{videoId}/continuity`.
#[derive(Debug, Clone)]
pub struct HttpContinuityClient {
    http: Client,
    config: SyncConfig,
}

impl HttpContinuityClient {
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("shotline-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> SyncResult<Self> {
        Self::new(SyncConfig::from_env()?)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn continuity_url(&self, video_id: &VideoId) -> String {
        format!(
            "{}/scenes/{}/continuity",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(video_id.as_str())
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Overwrite the video's continuity document. Idempotent.
    pub async fn patch_continuity(
        &self,
        video_id: &VideoId,
        document: &ContinuityDocument,
    ) -> SyncResult<()> {
        let url = self.continuity_url(video_id);

        self.execute_request("patch_continuity", video_id, async {
            let response = self
                .authorize(self.http.patch(&url))
                .json(document)
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                debug!(
                    video_id = %video_id,
                    scenes = document.continuity_groups.len(),
                    groups = document.group_count(),
                    "Saved continuity document"
                );
                Ok(())
            } else {
                Err(Self::handle_error_response(status, &url, response).await)
            }
        })
        .await
    }

    /// Fetch the stored document as written, before migration.
    pub async fn get_continuity(
        &self,
        video_id: &VideoId,
    ) -> SyncResult<Option<StoredContinuityDocument>> {
        let url = self.continuity_url(video_id);

        self.execute_request("get_continuity", video_id, async {
            let response = self.authorize(self.http.get(&url)).send().await?;
            let status = response.status();

            match status {
                StatusCode::OK => {
                    let document: StoredContinuityDocument = response.json().await?;
                    Ok(Some(document))
                }
                StatusCode::NOT_FOUND => Ok(None),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal
    // =========================================================================

    async fn execute_request<T, F>(&self, operation: &str, video_id: &VideoId, fut: F) -> SyncResult<T>
    where
        F: std::future::Future<Output = SyncResult<T>>,
    {
        let span = info_span!("sync_request", operation = %operation, video_id = %video_id);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> SyncError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            if let Some(secs) = retry_after {
                return SyncError::RateLimited(secs.saturating_mul(1000));
            }
        }
        let body = response.text().await.unwrap_or_default();
        SyncError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[async_trait]
impl ContinuityPersistence for HttpContinuityClient {
    async fn save(&self, video_id: &VideoId, document: &ContinuityDocument) -> SyncResult<()> {
        retry_persistence(&self.config.retry, PersistCall::Save, video_id, || {
            self.patch_continuity(video_id, document)
        })
        .await
    }

    async fn load(&self, video_id: &VideoId) -> SyncResult<Option<ContinuityDocument>> {
        let stored = retry_persistence(&self.config.retry, PersistCall::Load, video_id, || {
            self.get_continuity(video_id)
        })
        .await?;
        Ok(stored.map(StoredContinuityDocument::migrate))
    }
}

// =============================================================================
// Tests
// =============================================================================
