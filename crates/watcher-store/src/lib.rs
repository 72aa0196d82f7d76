#![warn(missing_docs)]
//! # watcher-store
//!
//! ## Purpose
//! Implements the persisted state of the monitoring loop: the rolling
//! detection log and the report stores (local and remote).
//!
//! ## Responsibilities
//! - Abstract durable key/value persistence behind a backend trait.
//! - Maintain the bounded, recency-ordered detection log with full-snapshot
//!   persistence and tolerant reload.
//! - Persist/retrieve reports locally (capped, newest-first) and remotely via
//!   the detection history API.
//! - Derive report statistics and idempotency keys.
//!
//! ## Data flow
//! The monitor loop appends [`DetectionEntry`] values into [`DetectionLog`];
//! the alert dispatcher saves [`Report`] values through a [`ReportStore`];
//! the reconciliation view reads history back through the same trait.
//!
//! ## Ownership and lifetimes
//! Stores own their backends via `Arc` so the log, dispatcher, and view can
//! share one persistence layer without borrow coupling.
//!
//! ## Error model
//! Backend and codec failures are [`StoreError`] values. Detection-log
//! persist failures are logged and swallowed; malformed persisted blobs load
//! as empty history.
//!
//! ## Security and privacy notes
//! Auth tokens handed to the remote store are forwarded as query/body values
//! and never logged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;
use watcher_core::{
    CameraIdentity, DetectionEntry, Report, ReportStatus, ThreatAssessment, ThreatLevel,
    decode_entries, decode_reports, encode_entries, encode_reports,
};

/// Storage namespace for the rolling detection log.
pub const DETECTION_LOG_KEY: &str = "liveDetections";

/// Storage namespace for the local report list.
pub const REPORT_STORE_KEY: &str = "threatReports";

/// Default rolling detection-log capacity.
pub const DETECTION_LOG_CAPACITY: usize = 10;

/// Maximum reports kept in the local store.
pub const REPORT_STORE_CAP: usize = 100;

const MS_PER_DAY: u64 = 86_400_000;

/// Durable key/value persistence backend (the browser-localStorage analogue).
pub trait KeyValueStore: Send + Sync {
    /// Reads the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrites the blob stored under `key`.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the write fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the blob stored under `key`.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the removal fails.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend for tests and the demo fallback path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        blobs.remove(key);
        Ok(())
    }
}

/// Bounded, recency-ordered detection history feeding the live log UI.
///
/// Insertion order equals recency order: the most recent entry is first.
/// Every append persists the full post-append snapshot; persistence is
/// eventually consistent with memory and never partial.
pub struct DetectionLog {
    capacity: usize,
    storage_key: String,
    entries: Vec<DetectionEntry>,
    store: Arc<dyn KeyValueStore>,
}

impl DetectionLog {
    /// Opens a detection log, loading any persisted history.
    ///
    /// Malformed persisted content is treated as empty history, not a fatal
    /// error.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidCapacity`] when `capacity == 0`.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        capacity: usize,
        storage_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        if capacity == 0 {
            return Err(StoreError::InvalidCapacity);
        }

        let storage_key = storage_key.into();
        let entries = match store.get(&storage_key) {
            Some(raw) => match decode_entries(&raw) {
                Ok(mut loaded) => {
                    loaded.truncate(capacity);
                    loaded
                }
                Err(error) => {
                    log::warn!("persisted detection log is malformed, starting empty: {error}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Ok(Self {
            capacity,
            storage_key,
            entries,
            store,
        })
    }

    /// Opens a log with the default capacity and namespace.
    ///
    /// # Errors
    /// See [`DetectionLog::open`].
    pub fn open_default(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Self::open(store, DETECTION_LOG_CAPACITY, DETECTION_LOG_KEY)
    }

    /// Prepends an entry, evicts beyond capacity, and persists the snapshot.
    ///
    /// Entry ids stay unique and monotonic: an id colliding with the current
    /// head is bumped past it. Persist failures are logged and swallowed so
    /// the polling loop continues.
    pub fn append(&mut self, mut entry: DetectionEntry) {
        if let Some(head) = self.entries.first()
            && entry.id <= head.id
        {
            entry.id = head.id + 1;
        }

        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);

        match encode_entries(&self.entries) {
            Ok(blob) => {
                if let Err(error) = self.store.set(&self.storage_key, &blob) {
                    log::warn!("detection log persist failed: {error}");
                }
            }
            Err(error) => log::warn!("detection log encode failed: {error}"),
        }
    }

    /// Returns the entries, most recent first.
    pub fn entries(&self) -> &[DetectionEntry] {
        &self.entries
    }

    /// Returns the current entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all entries from memory and durable storage.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(error) = self.store.remove(&self.storage_key) {
            log::warn!("detection log clear failed: {error}");
        }
    }
}

/// Scope selector for history reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFilter {
    /// Every stored report.
    All,
    /// Only warning/danger reports (the "threat history" view).
    ThreatsOnly,
}

/// Outcome of a report save call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The report was persisted.
    Saved,
    /// The store's persistence policy skipped this report.
    Skipped,
}

/// Aggregate counts over stored reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    /// All stored reports.
    pub total: usize,
    /// Danger-level reports.
    pub danger: usize,
    /// Warning-level reports.
    pub warning: usize,
    /// Safe-level reports.
    pub safe: usize,
    /// Reports generated on the same UTC day as the stats call.
    pub today: usize,
}

/// Persistence interface for detection reports.
pub trait ReportStore: Send + Sync {
    /// Persists one report, newest-first.
    ///
    /// # Errors
    /// Returns [`StoreError`] on backend or codec failures.
    fn save(&self, report: &Report) -> Result<SaveOutcome, StoreError>;

    /// Returns up to `limit` stored reports, newest-first.
    ///
    /// # Errors
    /// Returns [`StoreError`] on backend or codec failures.
    fn recent(&self, limit: usize, filter: HistoryFilter) -> Result<Vec<Report>, StoreError>;

    /// Deletes one report by id. Unknown ids are a no-op.
    ///
    /// # Errors
    /// Returns [`StoreError`] on backend or codec failures.
    fn delete(&self, report_id: &str) -> Result<(), StoreError>;

    /// Removes every stored report.
    ///
    /// # Errors
    /// Returns [`StoreError`] on backend failures.
    fn clear(&self) -> Result<(), StoreError>;

    /// Computes aggregate counts over stored reports; `now_ms` anchors the
    /// same-day count.
    ///
    /// # Errors
    /// Returns [`StoreError`] on backend or codec failures.
    fn stats(&self, now_ms: u64) -> Result<ReportStats, StoreError>;
}

/// Report store backed by the local key/value backend.
///
/// Keeps at most [`REPORT_STORE_CAP`] reports, newest first, under
/// [`REPORT_STORE_KEY`]. Malformed persisted content loads as empty.
pub struct LocalReportStore {
    storage_key: String,
    cap: usize,
    store: Arc<dyn KeyValueStore>,
}

impl LocalReportStore {
    /// Creates a local store with the default key and cap.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage_key: REPORT_STORE_KEY.to_string(),
            cap: REPORT_STORE_CAP,
            store,
        }
    }

    /// Creates a local store with a custom namespace and cap.
    pub fn with_namespace(
        store: Arc<dyn KeyValueStore>,
        storage_key: impl Into<String>,
        cap: usize,
    ) -> Self {
        Self {
            storage_key: storage_key.into(),
            cap: cap.max(1),
            store,
        }
    }

    fn load(&self) -> Vec<Report> {
        match self.store.get(&self.storage_key) {
            Some(raw) => match decode_reports(&raw) {
                Ok(reports) => reports,
                Err(error) => {
                    log::warn!("persisted report list is malformed, starting empty: {error}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    fn persist(&self, reports: &[Report]) -> Result<(), StoreError> {
        let blob = encode_reports(reports).map_err(|error| StoreError::Codec(error.to_string()))?;
        self.store.set(&self.storage_key, &blob)
    }
}

impl ReportStore for LocalReportStore {
    fn save(&self, report: &Report) -> Result<SaveOutcome, StoreError> {
        let mut reports = self.load();
        reports.insert(0, report.clone());
        reports.truncate(self.cap);
        self.persist(&reports)?;
        Ok(SaveOutcome::Saved)
    }

    fn recent(&self, limit: usize, filter: HistoryFilter) -> Result<Vec<Report>, StoreError> {
        let reports = self.load();
        Ok(apply_filter(reports, filter).into_iter().take(limit).collect())
    }

    fn delete(&self, report_id: &str) -> Result<(), StoreError> {
        let mut reports = self.load();
        reports.retain(|report| report.id != report_id);
        self.persist(&reports)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.storage_key)
    }

    fn stats(&self, now_ms: u64) -> Result<ReportStats, StoreError> {
        Ok(tally_reports(&self.load(), now_ms))
    }
}

fn tally_reports(reports: &[Report], now_ms: u64) -> ReportStats {
    let mut stats = ReportStats {
        total: reports.len(),
        ..ReportStats::default()
    };
    for report in reports {
        match report.threat_level {
            ThreatLevel::Danger => stats.danger += 1,
            ThreatLevel::Warning => stats.warning += 1,
            ThreatLevel::Safe => stats.safe += 1,
        }
        if report.timestamp_ms / MS_PER_DAY == now_ms / MS_PER_DAY {
            stats.today += 1;
        }
    }
    stats
}

fn apply_filter(reports: Vec<Report>, filter: HistoryFilter) -> Vec<Report> {
    match filter {
        HistoryFilter::All => reports,
        HistoryFilter::ThreatsOnly => reports
            .into_iter()
            .filter(|report| report.threat_level.is_qualifying())
            .collect(),
    }
}

/// Client-side persistence policy for the authoritative history.
///
/// By default only qualifying (warning/danger) detections with confidence at
/// or above the floor are persisted remotely. `persist_safe` widens this to
/// safe detections, matching the all-detections source variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorePolicy {
    /// Also persist safe-level detections meeting the confidence floor.
    pub persist_safe: bool,
    /// Minimum confidence required for persistence.
    pub min_confidence: f64,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            persist_safe: false,
            min_confidence: 0.7,
        }
    }
}

impl StorePolicy {
    /// Returns `true` when a detection at this level/confidence is persisted.
    pub fn allows(&self, level: ThreatLevel, confidence: f64) -> bool {
        if confidence < self.min_confidence {
            return false;
        }
        level.is_qualifying() || self.persist_safe
    }
}

/// Raw HTTP reply from the detection history API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Abstract transport for the detection history API.
pub trait DetectionApiTransport: Send + Sync {
    /// POSTs a JSON body to the detections endpoint.
    ///
    /// # Errors
    /// Returns [`StoreError::Transport`] on connectivity failures.
    fn post_json(&self, endpoint: &str, body: &str) -> Result<ApiReply, StoreError>;

    /// GETs a detections query URL.
    ///
    /// # Errors
    /// Returns [`StoreError::Transport`] on connectivity failures.
    fn get(&self, url: &str) -> Result<ApiReply, StoreError>;
}

/// Detection record as it crosses the history API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDetection {
    /// Server-assigned identifier, when reading back.
    #[serde(default)]
    pub id: Option<String>,
    /// Camera the detection originated from.
    #[serde(default)]
    pub camera_name: String,
    /// Whether a non-safe threat was detected.
    #[serde(default)]
    pub threat_detected: bool,
    /// Threat level.
    pub threat_level: ThreatLevel,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Confidence in `[0,1]`.
    #[serde(default)]
    pub confidence: f64,
    /// Detected object labels.
    #[serde(default)]
    pub objects_detected: Vec<String>,
    /// People count.
    #[serde(default)]
    pub people_count: u32,
    /// Recommended action text.
    #[serde(default)]
    pub recommended_action: String,
    /// Additional detail lines.
    #[serde(default)]
    pub details: Vec<String>,
    /// Optional snapshot image reference.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Detection time in epoch milliseconds.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl WireDetection {
    /// Builds the wire shape from a report.
    pub fn from_report(report: &Report) -> Self {
        Self {
            id: Some(report.id.clone()),
            camera_name: report.camera_name.clone(),
            threat_detected: report.threat_level.is_qualifying(),
            threat_level: report.threat_level,
            description: report.description.clone(),
            confidence: report.confidence,
            objects_detected: report.objects_detected.clone(),
            people_count: report.people_count,
            recommended_action: report.recommended_action.clone(),
            details: report.details.clone(),
            image_url: report.snapshot_image.clone(),
            timestamp_ms: report.timestamp_ms,
        }
    }

    /// Converts the wire shape back into a report for display.
    pub fn into_report(self, camera: &CameraIdentity) -> Report {
        let camera_name = if self.camera_name.trim().is_empty() {
            camera.name.clone()
        } else {
            self.camera_name.clone()
        };

        let assessment = ThreatAssessment {
            threat_level: self.threat_level,
            description: self.description,
            confidence: watcher_core::clamp_confidence(self.confidence),
            objects_detected: self.objects_detected,
            people_count: self.people_count,
            recommended_action: self.recommended_action,
            details: self.details,
            captured_image: self.image_url,
        };

        let mut report = Report::from_assessment(&assessment, self.timestamp_ms, camera, None);
        report.camera_name = camera_name;
        if let Some(id) = self.id {
            report.id = id;
        }
        report.status = ReportStatus::Active;
        report
    }
}

#[derive(Debug, Serialize)]
struct SaveDetectionRequest<'a> {
    auth_token: &'a str,
    camera_name: &'a str,
    detection: WireDetection,
    idempotency_key: String,
}

#[derive(Debug, Deserialize)]
struct SaveDetectionReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HistoryReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    detections: Vec<WireDetection>,
}

/// Report store backed by the remote detection history API.
pub struct RemoteReportStore {
    endpoint: String,
    auth_token: String,
    camera: CameraIdentity,
    policy: StorePolicy,
    transport: Arc<dyn DetectionApiTransport>,
}

impl RemoteReportStore {
    /// Creates a remote store for the given endpoint and session token.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: impl Into<String>,
        camera: CameraIdentity,
        policy: StorePolicy,
        transport: Arc<dyn DetectionApiTransport>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
            camera,
            policy,
            transport,
        }
    }

    // The token is caller-supplied opaque text; query encoding keeps tokens
    // with URL metacharacters intact.
    fn history_url(&self, limit: usize) -> Result<String, StoreError> {
        let mut url = Url::parse(&self.endpoint).map_err(|error| {
            StoreError::Backend(format!("invalid detections endpoint: {error}"))
        })?;
        url.query_pairs_mut()
            .append_pair("auth_token", &self.auth_token)
            .append_pair("limit", &limit.to_string());
        Ok(url.into())
    }
}

impl ReportStore for RemoteReportStore {
    fn save(&self, report: &Report) -> Result<SaveOutcome, StoreError> {
        if !self.policy.allows(report.threat_level, report.confidence) {
            return Ok(SaveOutcome::Skipped);
        }

        let request = SaveDetectionRequest {
            auth_token: &self.auth_token,
            camera_name: &self.camera.name,
            detection: WireDetection::from_report(report),
            idempotency_key: detection_idempotency_key(report.timestamp_ms, &report.description),
        };
        let body = serde_json::to_string(&request)
            .map_err(|error| StoreError::Codec(error.to_string()))?;

        let reply = self.transport.post_json(&self.endpoint, &body)?;
        if !(200..300).contains(&reply.status) {
            return Err(StoreError::Backend(format!(
                "detections endpoint returned status {}",
                reply.status
            )));
        }

        let parsed: SaveDetectionReply = serde_json::from_str(&reply.body)
            .map_err(|error| StoreError::Codec(error.to_string()))?;
        if !parsed.success {
            return Err(StoreError::Contract(if parsed.message.is_empty() {
                "detections endpoint reported success=false".to_string()
            } else {
                parsed.message
            }));
        }

        Ok(SaveOutcome::Saved)
    }

    fn recent(&self, limit: usize, filter: HistoryFilter) -> Result<Vec<Report>, StoreError> {
        let reply = self.transport.get(&self.history_url(limit)?)?;
        if !(200..300).contains(&reply.status) {
            return Err(StoreError::Backend(format!(
                "detections endpoint returned status {}",
                reply.status
            )));
        }

        let parsed: HistoryReply = serde_json::from_str(&reply.body)
            .map_err(|error| StoreError::Codec(error.to_string()))?;
        if !parsed.success {
            return Err(StoreError::Contract(
                "detections endpoint reported success=false".to_string(),
            ));
        }

        let reports = parsed
            .detections
            .into_iter()
            .map(|detection| detection.into_report(&self.camera))
            .collect();
        Ok(apply_filter(reports, filter).into_iter().take(limit).collect())
    }

    fn delete(&self, _report_id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported(
            "remote history does not support client-side deletion".to_string(),
        ))
    }

    fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Unsupported(
            "remote history does not support client-side clearing".to_string(),
        ))
    }

    fn stats(&self, now_ms: u64) -> Result<ReportStats, StoreError> {
        let reports = self.recent(REPORT_STORE_CAP, HistoryFilter::All)?;
        Ok(tally_reports(&reports, now_ms))
    }
}

/// Derives a stable idempotency key for one persisted detection.
///
/// Identical captures (same id and description) produce identical keys, so
/// the history endpoint can drop duplicate submissions.
pub fn detection_idempotency_key(capture_id_ms: u64, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(capture_id_ms.to_be_bytes());
    hasher.update(b":");
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds the deterministic demo report used by tests and the demo fallback.
pub fn demo_report(generated_at_ms: u64) -> Report {
    let assessment = ThreatAssessment {
        threat_level: ThreatLevel::Warning,
        description:
            "Suspicious activity detected: Person lingering near entrance after business hours"
                .to_string(),
        confidence: 0.87,
        objects_detected: vec![
            "person".to_string(),
            "door".to_string(),
            "bag".to_string(),
            "vehicle".to_string(),
        ],
        people_count: 1,
        recommended_action: "Review footage and alert security personnel".to_string(),
        details: vec![
            "Single individual observed near main entrance".to_string(),
            "Person carrying large backpack".to_string(),
            "Activity occurred outside normal business hours".to_string(),
        ],
        captured_image: None,
    };

    Report::from_assessment(&assessment, generated_at_ms, &CameraIdentity::default(), None)
}

/// Store layer error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Log capacity must be strictly positive.
    #[error("detection log capacity must be greater than zero")]
    InvalidCapacity,
    /// Blob encode/decode failure.
    #[error("store codec failure: {0}")]
    Codec(String),
    /// Persistence backend failure.
    #[error("store backend failure: {0}")]
    Backend(String),
    /// Network transport failure.
    #[error("store transport failure: {0}")]
    Transport(String),
    /// Remote endpoint violated its contract.
    #[error("store contract violation: {0}")]
    Contract(String),
    /// Operation is not available on this store.
    #[error("unsupported store operation: {0}")]
    Unsupported(String),
}
