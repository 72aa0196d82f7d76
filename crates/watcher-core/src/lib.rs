#![warn(missing_docs)]
//! # watcher-core
//!
//! ## Purpose
//! Defines the pure data model used across the `watcher` workspace.
//!
//! ## Responsibilities
//! - Represent threat assessments returned by the frame analysis service.
//! - Represent rolling detection-log entries (real assessments and synthetic
//!   system messages).
//! - Derive persisted reports from qualifying assessments.
//! - Encode/decode persisted JSON blobs for the local stores.
//!
//! ## Data flow
//! The analysis boundary validates raw service output into
//! [`ThreatAssessment`]. The monitor loop wraps assessments into
//! [`DetectionEntry`] values for the rolling log, and the alert dispatcher
//! derives [`Report`] records for the report store.
//!
//! ## Ownership and lifetimes
//! All model types own their string/buffer contents to avoid hidden
//! borrow/lifetime coupling between loop stages and persistence.
//!
//! ## Error model
//! Codec failures return [`CoreError`]; display formatting never fails (it
//! degrades to the raw millisecond value).
//!
//! ## Security and privacy notes
//! Snapshot image payloads are treated as opaque base64 strings and are never
//! logged by this crate.
//!
//! ## Example
//! ```rust
//! use watcher_core::{Priority, ThreatLevel};
//!
//! assert!(ThreatLevel::Danger.is_qualifying());
//! assert_eq!(ThreatLevel::Danger.priority(), Priority::High);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Ordinal threat classification assigned by the frame analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    /// No threat observed.
    Safe,
    /// Suspicious activity worth reviewing.
    Warning,
    /// Active threat requiring immediate attention.
    Danger,
}

impl ThreatLevel {
    /// Returns `true` for levels that trigger report/email side effects.
    pub fn is_qualifying(self) -> bool {
        matches!(self, ThreatLevel::Warning | ThreatLevel::Danger)
    }

    /// Maps the level to report priority.
    pub fn priority(self) -> Priority {
        match self {
            ThreatLevel::Danger => Priority::High,
            ThreatLevel::Warning => Priority::Medium,
            ThreatLevel::Safe => Priority::Low,
        }
    }

    /// Uppercase label used in email template parameters.
    pub fn label_upper(self) -> &'static str {
        match self {
            ThreatLevel::Safe => "SAFE",
            ThreatLevel::Warning => "WARNING",
            ThreatLevel::Danger => "DANGER",
        }
    }
}

/// Report priority derived from threat level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine review.
    Low,
    /// Elevated review.
    Medium,
    /// Immediate review.
    High,
}

/// Review status of a persisted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    /// Newly generated, not yet triaged.
    #[serde(rename = "active")]
    Active,
    /// Triaged and being investigated.
    #[serde(rename = "under-review")]
    UnderReview,
    /// Closed after review.
    #[serde(rename = "resolved")]
    Resolved,
}

/// One validated analysis result from the frame analysis service.
///
/// Immutable once produced by the analysis boundary. `confidence` is always
/// within `[0.0, 1.0]`; callers constructing assessments directly should pass
/// raw values through [`clamp_confidence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Classified threat level.
    pub threat_level: ThreatLevel,
    /// Free-text description of what was observed.
    pub description: String,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Labels of detected objects, in service order.
    pub objects_detected: Vec<String>,
    /// Number of people detected in the frame.
    pub people_count: u32,
    /// Free-text recommended operator action.
    pub recommended_action: String,
    /// Additional detail lines reported by the service.
    #[serde(default)]
    pub details: Vec<String>,
    /// Optional base64-encoded still of the analyzed frame.
    #[serde(default)]
    pub captured_image: Option<String>,
}

/// Clamps a raw confidence value into `[0.0, 1.0]`.
///
/// Non-finite values degrade to `0.0`; they are never propagated downstream.
pub fn clamp_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}

/// Discriminates real assessments from synthesized system messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectionKind {
    /// Entry produced by a successful analysis call.
    Assessment(ThreatAssessment),
    /// Locally synthesized message (report generated, email sent, error).
    System,
}

/// One row in the rolling live detection log.
///
/// Entries are created once and never mutated; the log evicts oldest-first
/// when it exceeds capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEntry {
    /// Unique monotonic identifier (capture epoch milliseconds).
    pub id: u64,
    /// Capture time in Unix epoch milliseconds.
    pub captured_at_ms: u64,
    /// Display text derived at creation time.
    pub text: String,
    /// Entry payload discriminator.
    pub kind: DetectionKind,
}

impl DetectionEntry {
    /// Wraps a validated assessment into a log entry.
    pub fn from_assessment(assessment: ThreatAssessment, captured_at_ms: u64) -> Self {
        let text = if assessment.description.trim().is_empty() {
            format!("{} detection", assessment.threat_level.label_upper())
        } else {
            assessment.description.clone()
        };

        Self {
            id: captured_at_ms,
            captured_at_ms,
            text,
            kind: DetectionKind::Assessment(assessment),
        }
    }

    /// Creates a synthetic system-message entry.
    pub fn system(message: impl Into<String>, captured_at_ms: u64) -> Self {
        Self {
            id: captured_at_ms,
            captured_at_ms,
            text: message.into(),
            kind: DetectionKind::System,
        }
    }

    /// Returns the threat level for assessment entries.
    pub fn threat_level(&self) -> Option<ThreatLevel> {
        match &self.kind {
            DetectionKind::Assessment(assessment) => Some(assessment.threat_level),
            DetectionKind::System => None,
        }
    }
}

/// Identity of the camera a detection originated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraIdentity {
    /// Human-readable camera name.
    pub name: String,
    /// Stable camera identifier.
    pub id: String,
}

impl Default for CameraIdentity {
    fn default() -> Self {
        Self {
            name: "Live Camera".to_string(),
            id: "live-camera-1".to_string(),
        }
    }
}

/// Persisted record of a qualifying detection, used for after-the-fact review.
///
/// Serialized camelCase to match the persisted report-blob format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique generation-time identifier (`report-<epoch ms>`).
    pub id: String,
    /// Generation time in Unix epoch milliseconds.
    pub timestamp_ms: u64,
    /// Threat level copied from the assessment.
    pub threat_level: ThreatLevel,
    /// Description copied from the assessment.
    pub description: String,
    /// Confidence copied from the assessment.
    pub confidence: f64,
    /// Detected object labels copied from the assessment.
    pub objects_detected: Vec<String>,
    /// People count copied from the assessment.
    pub people_count: u32,
    /// Recommended action copied from the assessment.
    pub recommended_action: String,
    /// Detail lines copied from the assessment.
    #[serde(default)]
    pub details: Vec<String>,
    /// Optional base64 snapshot taken at qualification time.
    #[serde(default)]
    pub snapshot_image: Option<String>,
    /// Camera name the detection originated from.
    pub camera_name: String,
    /// Camera identifier the detection originated from.
    pub camera_id: String,
    /// Review status, mutated only by the review UI.
    pub status: ReportStatus,
    /// Priority derived from the threat level.
    pub priority: Priority,
}

impl Report {
    /// Derives a report from a qualifying assessment.
    ///
    /// `snapshot_image` should be a fresh still captured at the moment of
    /// qualification when a snapshot source is available; it falls back to the
    /// image analyzed with the assessment otherwise.
    pub fn from_assessment(
        assessment: &ThreatAssessment,
        generated_at_ms: u64,
        camera: &CameraIdentity,
        snapshot_image: Option<String>,
    ) -> Self {
        Self {
            id: format!("report-{generated_at_ms}"),
            timestamp_ms: generated_at_ms,
            threat_level: assessment.threat_level,
            description: assessment.description.clone(),
            confidence: assessment.confidence,
            objects_detected: assessment.objects_detected.clone(),
            people_count: assessment.people_count,
            recommended_action: assessment.recommended_action.clone(),
            details: assessment.details.clone(),
            snapshot_image: snapshot_image.or_else(|| assessment.captured_image.clone()),
            camera_name: camera.name.clone(),
            camera_id: camera.id.clone(),
            status: ReportStatus::Active,
            priority: assessment.threat_level.priority(),
        }
    }
}

/// Serializes a detection-log snapshot to a persisted JSON blob.
///
/// # Errors
/// Returns [`CoreError::Codec`] when JSON serialization fails.
pub fn encode_entries(entries: &[DetectionEntry]) -> Result<String, CoreError> {
    serde_json::to_string(entries).map_err(CoreError::Codec)
}

/// Deserializes a persisted detection-log blob.
///
/// # Errors
/// Returns [`CoreError::Codec`] when JSON decoding fails. Callers loading
/// startup state treat this as empty history, not a fatal error.
pub fn decode_entries(raw: &str) -> Result<Vec<DetectionEntry>, CoreError> {
    serde_json::from_str(raw).map_err(CoreError::Codec)
}

/// Serializes a report list to a persisted JSON blob.
///
/// # Errors
/// Returns [`CoreError::Codec`] when JSON serialization fails.
pub fn encode_reports(reports: &[Report]) -> Result<String, CoreError> {
    serde_json::to_string(reports).map_err(CoreError::Codec)
}

/// Deserializes a persisted report-list blob.
///
/// # Errors
/// Returns [`CoreError::Codec`] when JSON decoding fails.
pub fn decode_reports(raw: &str) -> Result<Vec<Report>, CoreError> {
    serde_json::from_str(raw).map_err(CoreError::Codec)
}

/// Formats an epoch-millisecond timestamp as RFC 3339 UTC for display text.
///
/// Formatting never fails at the call site; out-of-range inputs degrade to the
/// raw millisecond value.
pub fn format_timestamp_utc(epoch_ms: u64) -> String {
    let seconds = (epoch_ms / 1_000) as i64;
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .and_then(|datetime| datetime.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{epoch_ms}"))
}

/// Error type for core codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON encoding/decoding error.
    #[error("model codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
