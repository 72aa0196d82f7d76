//! Best-effort backend usage telemetry.

use watcher_analysis::{AnalysisTransport, HealthSnapshot, fetch_health};

/// Cached backend health snapshot, refreshed on a slow cadence.
///
/// Telemetry is advisory: a failed refresh keeps the previous snapshot and is
/// never surfaced as an error.
pub struct HealthTelemetry {
    endpoint: String,
    refresh_interval_ms: u64,
    last_refresh_ms: Option<u64>,
    snapshot: Option<HealthSnapshot>,
}

impl HealthTelemetry {
    /// Creates telemetry against a health endpoint.
    pub fn new(endpoint: impl Into<String>, refresh_interval_ms: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            refresh_interval_ms,
            last_refresh_ms: None,
            snapshot: None,
        }
    }

    /// Latest snapshot, if any refresh has succeeded.
    pub fn snapshot(&self) -> Option<&HealthSnapshot> {
        self.snapshot.as_ref()
    }

    /// Returns `true` when a refresh is due at `now_ms`.
    pub fn needs_refresh(&self, now_ms: u64) -> bool {
        match self.last_refresh_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.refresh_interval_ms,
            None => true,
        }
    }

    /// Refreshes the snapshot when due. Failures are logged and dropped.
    pub fn refresh(&mut self, transport: &dyn AnalysisTransport, now_ms: u64) {
        if !self.needs_refresh(now_ms) {
            return;
        }
        self.last_refresh_ms = Some(now_ms);
        match fetch_health(transport, &self.endpoint) {
            Ok(snapshot) => self.snapshot = Some(snapshot),
            Err(error) => log::debug!("health telemetry refresh failed: {error}"),
        }
    }
}
