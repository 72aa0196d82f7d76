#![warn(missing_docs)]
//! # watcher-analysis
//!
//! ## Purpose
//! Defines the frame-analysis service contract and the client that submits
//! captured stills for threat assessment.
//!
//! ## Responsibilities
//! - Parse versioned analyze-frame response payloads.
//! - Validate loosely-typed service output into strict [`ThreatAssessment`]
//!   values with explicit defaults for every optional field.
//! - Classify failures into retryable/non-retryable categories, separating
//!   service-unreachable conditions from generic failures.
//! - Parse best-effort health/usage telemetry.
//!
//! ## Data flow
//! Raw JSON response -> [`parse_analyze_response`] -> validated
//! [`ThreatAssessment`] consumed by the monitor loop and alert dispatcher.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs to avoid borrowing from transient network
//! buffers.
//!
//! ## Error model
//! All failures surface as [`AnalysisError`] carrying a reason and a
//! retryability hint; the monitor loop never aborts on a single failure.
//!
//! ## Security and privacy notes
//! This crate forwards frame bytes to the configured endpoint and processes
//! only assessment metadata in return; it does not touch auth secrets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use watcher_core::{ThreatAssessment, ThreatLevel, clamp_confidence};

/// Required analyze endpoint path suffix.
pub const ANALYZE_FRAME_PATH: &str = "/api/analyze-frame";

/// Health/usage telemetry endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Default description applied when the service omits one.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Default recommended action applied when the service omits one.
pub const DEFAULT_RECOMMENDED_ACTION: &str = "Continue monitoring";

/// Raw HTTP reply handed back by the injected transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Abstract transport used by the analysis client.
pub trait AnalysisTransport: Send + Sync {
    /// Submits one encoded frame to the analyze endpoint.
    ///
    /// # Errors
    /// Transport-level failures should be built with
    /// [`AnalysisError::from_transport_message`] so unreachable conditions are
    /// classified consistently.
    fn post_frame(&self, endpoint: &str, frame_jpeg: &[u8]) -> Result<HttpReply, AnalysisError>;

    /// Performs a plain GET against a telemetry endpoint.
    fn get(&self, endpoint: &str) -> Result<HttpReply, AnalysisError>;
}

/// Client wrapping the analyze-frame contract behind an injected transport.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoint: String,
    transport: Arc<dyn AnalysisTransport>,
}

impl AnalysisClient {
    /// Creates a validated analysis client.
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvalidEndpoint`] when the URL does not parse
    /// or does not end with [`ANALYZE_FRAME_PATH`].
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Result<Self, AnalysisError> {
        let endpoint = endpoint.into();
        validate_analysis_endpoint(&endpoint)?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Submits a frame and validates the assessment in the reply.
    ///
    /// # Errors
    /// Non-2xx statuses, `success:false` replies, and malformed payloads all
    /// yield typed [`AnalysisError`] values for the tick boundary to log.
    pub fn analyze(&self, frame_jpeg: &[u8]) -> Result<ThreatAssessment, AnalysisError> {
        let reply = self.transport.post_frame(&self.endpoint, frame_jpeg)?;
        if !(200..300).contains(&reply.status) {
            return Err(AnalysisError::Service {
                status: reply.status,
                reason: truncate_reason(&reply.body),
            });
        }

        parse_analyze_response(&reply.body)
    }

    /// Returns the configured analyze endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Validates the analyze endpoint contract.
///
/// The dev deployment runs over plain HTTP, so the scheme is not constrained;
/// only URL shape and path suffix are.
///
/// # Errors
/// Returns [`AnalysisError::InvalidEndpoint`] for unparseable URLs or path
/// mismatches.
pub fn validate_analysis_endpoint(endpoint: &str) -> Result<(), AnalysisError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| AnalysisError::InvalidEndpoint(format!("invalid analyze url: {error}")))?;

    if !parsed.path().ends_with(ANALYZE_FRAME_PATH) {
        return Err(AnalysisError::InvalidEndpoint(format!(
            "analyze endpoint path must end with {ANALYZE_FRAME_PATH}"
        )));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct AnalyzeFrameReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    analysis: Option<RawAssessment>,
}

/// Loosely-typed assessment shape as the service actually emits it.
///
/// Every field is optional; validation applies explicit defaults so nothing
/// optional or inconsistent reaches downstream consumers.
#[derive(Debug, Default, Deserialize)]
struct RawAssessment {
    threat_level: Option<String>,
    description: Option<String>,
    confidence: Option<f64>,
    objects_detected: Option<Vec<String>>,
    people_count: Option<i64>,
    recommended_action: Option<String>,
    details: Option<Vec<String>>,
    #[serde(alias = "image_data")]
    captured_image: Option<String>,
}

/// Parses and validates one analyze-frame response body.
///
/// # Errors
/// Returns [`AnalysisError::Decode`] for invalid JSON,
/// [`AnalysisError::Rejected`] when the service reports `success:false`, and
/// [`AnalysisError::Contract`] when the analysis object is missing.
pub fn parse_analyze_response(raw: &str) -> Result<ThreatAssessment, AnalysisError> {
    let reply: AnalyzeFrameReply = serde_json::from_str(raw).map_err(AnalysisError::Decode)?;

    if !reply.success {
        return Err(AnalysisError::Rejected(
            "analysis service reported success=false".to_string(),
        ));
    }

    let analysis = reply.analysis.ok_or_else(|| {
        AnalysisError::Contract("response is missing the analysis object".to_string())
    })?;

    Ok(validate_assessment(analysis))
}

fn validate_assessment(raw: RawAssessment) -> ThreatAssessment {
    ThreatAssessment {
        threat_level: parse_threat_level(raw.threat_level.as_deref()),
        description: non_blank_or(raw.description, DEFAULT_DESCRIPTION),
        confidence: clamp_confidence(raw.confidence.unwrap_or(0.0)),
        objects_detected: raw.objects_detected.unwrap_or_default(),
        people_count: u32::try_from(raw.people_count.unwrap_or(0).max(0)).unwrap_or(u32::MAX),
        recommended_action: non_blank_or(raw.recommended_action, DEFAULT_RECOMMENDED_ACTION),
        details: raw.details.unwrap_or_default(),
        captured_image: raw.captured_image,
    }
}

// Unknown level strings validate to Safe so a service-side vocabulary change
// cannot raise alarms or abort the loop.
fn parse_threat_level(raw: Option<&str>) -> ThreatLevel {
    match raw.map(str::trim) {
        Some(level) if level.eq_ignore_ascii_case("danger") => ThreatLevel::Danger,
        Some(level) if level.eq_ignore_ascii_case("warning") => ThreatLevel::Warning,
        _ => ThreatLevel::Safe,
    }
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => fallback.to_string(),
    }
}

fn truncate_reason(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// API usage counters reported by the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    /// Total analyze calls the service has performed.
    #[serde(default)]
    pub total_calls: u64,
    /// Analysis mode the service is running in.
    #[serde(default)]
    pub mode: String,
}

/// Health/usage telemetry snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Usage counters; defaults when the service omits them.
    #[serde(default)]
    pub api_usage: ApiUsage,
}

/// Parses a health endpoint body.
///
/// # Errors
/// Returns [`AnalysisError::Decode`] for invalid JSON. Callers polling
/// telemetry treat any error as best-effort and ignore it.
pub fn parse_health(raw: &str) -> Result<HealthSnapshot, AnalysisError> {
    serde_json::from_str(raw).map_err(AnalysisError::Decode)
}

/// Fetches and parses the health endpoint through the injected transport.
///
/// # Errors
/// Propagates transport and decode failures; callers ignore them.
pub fn fetch_health(
    transport: &dyn AnalysisTransport,
    endpoint: &str,
) -> Result<HealthSnapshot, AnalysisError> {
    let reply = transport.get(endpoint)?;
    if !(200..300).contains(&reply.status) {
        return Err(AnalysisError::Service {
            status: reply.status,
            reason: truncate_reason(&reply.body),
        });
    }
    parse_health(&reply.body)
}

/// Returns `true` when a transport message describes an unreachable service.
///
/// Message-content heuristic: the transports in use surface connectivity
/// problems as free text, so classification keys off common markers.
pub fn looks_unreachable(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    [
        "unreachable",
        "connection refused",
        "connection reset",
        "failed to fetch",
        "network",
        "timed out",
        "timeout",
        "dns",
    ]
    .iter()
    .any(|marker| lower.contains(marker))
}

/// Analysis contract and transport errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Endpoint violates the analyze contract.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Service could not be reached at all.
    #[error("analysis service unreachable: {0}")]
    Unreachable(String),
    /// Service replied with a non-2xx status.
    #[error("analysis service failure (status {status}): {reason}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Trimmed response body or failure text.
        reason: String,
    },
    /// Service replied 2xx but reported `success:false`.
    #[error("analysis rejected: {0}")]
    Rejected(String),
    /// Parsed payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    Contract(String),
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Classifies a free-text transport failure message.
    ///
    /// Unreachable-looking messages become [`AnalysisError::Unreachable`];
    /// everything else becomes a generic service failure.
    pub fn from_transport_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if looks_unreachable(&message) {
            AnalysisError::Unreachable(message)
        } else {
            AnalysisError::Service {
                status: 0,
                reason: message,
            }
        }
    }

    /// Returns `true` when retrying on a later tick may succeed.
    pub fn retryable(&self) -> bool {
        match self {
            AnalysisError::Unreachable(_) => true,
            AnalysisError::Service { status, .. } => *status == 0 || *status >= 500,
            AnalysisError::InvalidEndpoint(_)
            | AnalysisError::Rejected(_)
            | AnalysisError::Contract(_)
            | AnalysisError::Decode(_) => false,
        }
    }

    /// Returns `true` for unreachable-service failures.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, AnalysisError::Unreachable(_))
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
