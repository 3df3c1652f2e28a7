//! # Application State Management
//!
//! Shared state handed to every request handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc<RwLock<T>>
//! - **Arc**: every actix worker holds a clone of `AppState`; the clones share
//!   one config and one metrics block
//! - **RwLock**: many handlers read the config at once, `PUT /api/v1/config`
//!   is the only writer
//!
//! ### Arc<dyn MediaHost>
//! The media host is a trait object so tests can run the real upload handler
//! against a fake host. `SqlitePool` is already a cheap, clonable handle.
//!
//! ### Lock poisoning
//! Poisoned locks are recovered with `into_inner()`; the guarded data is
//! plain counters and settings.

use crate::config::AppConfig;
use crate::media::MediaHost;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration (uploads section can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request and upload counters
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Audio reference log
    pub db: SqlitePool,

    /// Where uploaded files are forwarded
    pub media: Arc<dyn MediaHost>,

    pub start_time: Instant,
}

/// Counters collected across all requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub uploads: UploadMetrics,
    /// Key: endpoint (e.g. "POST /upload-audio")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Upload pipeline counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadMetrics {
    pub succeeded: u64,
    pub failed: u64,
    pub bytes_received: u64,
    /// Uploads between "multipart received" and "response sent"
    pub in_flight: u32,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, db: SqlitePool, media: Arc<dyn MediaHost>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            db,
            media,
            start_time: Instant::now(),
        }
    }

    fn metrics_mut(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(|e| e.into_inner())
    }

    fn metrics_ref(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current configuration. Cloning releases the lock right away.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        new_config.validate().map_err(|e| e.to_string())?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = new_config;
        Ok(())
    }

    pub fn increment_request_count(&self) {
        self.metrics_mut().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics_mut().error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_mut();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Mark an upload as started. Pair with `finish_upload`.
    pub fn begin_upload(&self) {
        self.metrics_mut().uploads.in_flight += 1;
    }

    /// Start counting an upload. The counters are settled when the tracker
    /// drops, so a request whose future is dropped mid-upload still leaves
    /// `in_flight` and is counted as failed.
    pub fn track_upload(&self) -> UploadTracker {
        self.begin_upload();
        UploadTracker {
            state: self.clone(),
            bytes: 0,
            succeeded: false,
        }
    }

    /// Mark an upload as finished, successful or not.
    pub fn finish_upload(&self, bytes: u64, succeeded: bool) {
        let mut metrics = self.metrics_mut();
        let uploads = &mut metrics.uploads;

        uploads.in_flight = uploads.in_flight.saturating_sub(1);
        uploads.bytes_received += bytes;
        if succeeded {
            uploads.succeeded += 1;
        } else {
            uploads.failed += 1;
        }
    }

    /// Consistent copy of all counters, taken under one read lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_ref().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Guard returned by `AppState::track_upload`.
#[derive(Debug)]
pub struct UploadTracker {
    state: AppState,
    bytes: u64,
    succeeded: bool,
}

impl UploadTracker {
    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    pub fn mark_succeeded(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for UploadTracker {
    fn drop(&mut self) {
        self.state.finish_upload(self.bytes, self.succeeded);
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// 0.0 to 1.0
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

/// Fakes shared by handler tests.
#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::media::{HostedAsset, MediaError};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Media host that records what it was given instead of calling out.
    #[derive(Debug, Default)]
    pub struct FakeMediaHost {
        pub fail_with: Option<String>,
        /// Never answer, like a host that stalls mid-request
        pub hang: bool,
        pub unconfigured: bool,
        /// (file name, bytes, path) per call
        pub calls: Mutex<Vec<(String, Vec<u8>, PathBuf)>>,
    }

    impl FakeMediaHost {
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::default()
            }
        }

        pub fn unconfigured() -> Self {
            Self {
                unconfigured: true,
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MediaHost for FakeMediaHost {
        async fn upload(&self, path: &Path, file_name: &str) -> Result<HostedAsset, MediaError> {
            let bytes = tokio::fs::read(path).await?;
            self.calls
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.clone(), path.to_path_buf()));

            if self.hang {
                std::future::pending::<()>().await;
            }

            if let Some(message) = &self.fail_with {
                return Err(MediaError::Rejected {
                    status: 400,
                    message: message.clone(),
                });
            }

            Ok(HostedAsset {
                secure_url: format!("https://media.test/video/upload/{}", file_name),
                public_id: file_name.to_string(),
                bytes: bytes.len() as u64,
                format: Some("webm".to_string()),
                duration: None,
            })
        }

        fn name(&self) -> &'static str {
            "fake"
        }

        fn is_configured(&self) -> bool {
            !self.unconfigured
        }
    }

    /// State backed by an in-memory database and the given host.
    pub async fn test_state(config: AppConfig, media: Arc<FakeMediaHost>) -> AppState {
        let db = crate::db::memory_pool().await;
        AppState::new(config, db, media)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_upload_counters() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;

        state.begin_upload();
        state.begin_upload();
        assert_eq!(state.get_metrics_snapshot().uploads.in_flight, 2);

        state.finish_upload(100, true);
        state.finish_upload(50, false);

        let uploads = state.get_metrics_snapshot().uploads;
        assert_eq!(uploads.in_flight, 0);
        assert_eq!(uploads.succeeded, 1);
        assert_eq!(uploads.failed, 1);
        assert_eq!(uploads.bytes_received, 150);
    }

    #[tokio::test]
    async fn test_dropped_tracker_counts_as_failed() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;

        let mut tracker = state.track_upload();
        tracker.add_bytes(42);
        assert_eq!(state.get_metrics_snapshot().uploads.in_flight, 1);
        drop(tracker);

        let mut tracker = state.track_upload();
        tracker.mark_succeeded();
        drop(tracker);

        let uploads = state.get_metrics_snapshot().uploads;
        assert_eq!(uploads.in_flight, 0);
        assert_eq!(uploads.failed, 1);
        assert_eq!(uploads.succeeded, 1);
        assert_eq!(uploads.bytes_received, 42);
    }

    #[tokio::test]
    async fn test_finish_upload_never_underflows() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        state.finish_upload(0, false);
        assert_eq!(state.get_metrics_snapshot().uploads.in_flight, 0);
    }

    #[tokio::test]
    async fn test_update_config_rejects_invalid() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        let mut bad = state.get_config();
        bad.uploads.max_file_size_bytes = 0;

        assert!(state.update_config(bad).is_err());
        assert_eq!(state.get_config().uploads.max_file_size_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_endpoint_metric_math() {
        let metric = EndpointMetric {
            request_count: 4,
            total_duration_ms: 100,
            error_count: 1,
        };
        assert_eq!(metric.average_duration_ms(), 25.0);
        assert_eq!(metric.error_rate(), 0.25);
        assert_eq!(EndpointMetric::default().error_rate(), 0.0);
    }
}
