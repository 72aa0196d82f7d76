//! Runtime configuration with JSON loading and validation.

use std::path::Path;

use serde::Deserialize;

use crate::AppError;

fn default_analysis_interval_ms() -> u64 {
    3_000
}

fn default_history_refresh_interval_ms() -> u64 {
    30_000
}

fn default_health_refresh_interval_ms() -> u64 {
    30_000
}

fn default_detection_log_capacity() -> usize {
    watcher_store::DETECTION_LOG_CAPACITY
}

fn default_detection_log_key() -> String {
    watcher_store::DETECTION_LOG_KEY.to_string()
}

fn default_report_store_key() -> String {
    watcher_store::REPORT_STORE_KEY.to_string()
}

fn default_camera_name() -> String {
    watcher_core::CameraIdentity::default().name
}

fn default_camera_id() -> String {
    watcher_core::CameraIdentity::default().id
}

fn default_analysis_endpoint() -> String {
    "http://127.0.0.1:9000/api/analyze-frame".to_string()
}

fn default_health_endpoint() -> String {
    "http://127.0.0.1:9000/health".to_string()
}

fn default_min_confidence() -> f64 {
    0.7
}

/// Runtime configuration, deserialized from JSON with per-field defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherConfig {
    /// Milliseconds between analysis polling ticks.
    #[serde(default = "default_analysis_interval_ms")]
    pub analysis_interval_ms: u64,
    /// Milliseconds between history reconciliation refreshes.
    #[serde(default = "default_history_refresh_interval_ms")]
    pub history_refresh_interval_ms: u64,
    /// Milliseconds between backend health telemetry refreshes.
    #[serde(default = "default_health_refresh_interval_ms")]
    pub health_refresh_interval_ms: u64,
    /// Bounded detection log capacity.
    #[serde(default = "default_detection_log_capacity")]
    pub detection_log_capacity: usize,
    /// Storage key for the detection log snapshot.
    #[serde(default = "default_detection_log_key")]
    pub detection_log_key: String,
    /// Storage key for locally persisted reports.
    #[serde(default = "default_report_store_key")]
    pub report_store_key: String,
    /// Human-readable camera name stamped into reports.
    #[serde(default = "default_camera_name")]
    pub camera_name: String,
    /// Stable camera identifier stamped into reports.
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    /// Frame analysis endpoint URL.
    #[serde(default = "default_analysis_endpoint")]
    pub analysis_endpoint: String,
    /// Backend health endpoint URL.
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,
    /// Detection history API endpoint URL, when remote sync is enabled.
    #[serde(default)]
    pub detections_endpoint: Option<String>,
    /// Shared token for the detection history API.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Whether safe-level assessments are persisted remotely.
    #[serde(default)]
    pub persist_safe: bool,
    /// Minimum confidence for remote detection persistence.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Minimum milliseconds between steady-state alert emails (0 disables).
    #[serde(default)]
    pub email_min_send_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            analysis_interval_ms: default_analysis_interval_ms(),
            history_refresh_interval_ms: default_history_refresh_interval_ms(),
            health_refresh_interval_ms: default_health_refresh_interval_ms(),
            detection_log_capacity: default_detection_log_capacity(),
            detection_log_key: default_detection_log_key(),
            report_store_key: default_report_store_key(),
            camera_name: default_camera_name(),
            camera_id: default_camera_id(),
            analysis_endpoint: default_analysis_endpoint(),
            health_endpoint: default_health_endpoint(),
            detections_endpoint: None,
            auth_token: None,
            persist_safe: false,
            min_confidence: default_min_confidence(),
            email_min_send_interval_ms: 0,
        }
    }
}

impl WatcherConfig {
    /// Parses a configuration document, then validates it.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] on malformed JSON or invalid values.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| AppError::Config(format!("malformed config document: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] on read, parse, or validation failures.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            AppError::Config(format!("unable to read '{}': {error}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Checks intervals, capacities, and endpoint shapes.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.analysis_interval_ms == 0 {
            return Err(AppError::Config(
                "analysis_interval_ms must be positive".to_string(),
            ));
        }
        if self.history_refresh_interval_ms == 0 {
            return Err(AppError::Config(
                "history_refresh_interval_ms must be positive".to_string(),
            ));
        }
        if self.detection_log_capacity == 0 {
            return Err(AppError::Config(
                "detection_log_capacity must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(AppError::Config(
                "min_confidence must be within [0, 1]".to_string(),
            ));
        }

        watcher_analysis::validate_analysis_endpoint(&self.analysis_endpoint)
            .map_err(|error| AppError::Config(format!("analysis_endpoint: {error}")))?;
        url::Url::parse(&self.health_endpoint)
            .map_err(|error| AppError::Config(format!("health_endpoint: {error}")))?;
        if let Some(endpoint) = &self.detections_endpoint {
            url::Url::parse(endpoint)
                .map_err(|error| AppError::Config(format!("detections_endpoint: {error}")))?;
        }

        Ok(())
    }

    /// Camera identity derived from configured name and id.
    pub fn camera(&self) -> watcher_core::CameraIdentity {
        watcher_core::CameraIdentity {
            name: self.camera_name.clone(),
            id: self.camera_id.clone(),
        }
    }

    /// Remote persistence policy derived from configured thresholds.
    pub fn store_policy(&self) -> watcher_store::StorePolicy {
        watcher_store::StorePolicy {
            persist_safe: self.persist_safe,
            min_confidence: self.min_confidence,
        }
    }
}
