#![warn(missing_docs)]
//! # watcher-app
//!
//! ## Purpose
//! Orchestrates capture, analysis, alerting, storage, and history views for
//! `watcher`.
//!
//! ## Responsibilities
//! - Drive the detection polling loop: sample frames, dispatch analysis,
//!   append results in tick order with single-flight and stream-generation
//!   cancellation.
//! - Reconcile the persisted report history on its own slower cadence.
//! - Refresh backend usage telemetry best-effort.
//! - Project subsystem state into a flat runtime status snapshot.
//!
//! ## Data flow
//! Frame source -> analysis dispatch -> detection log append + alert side
//! effects -> report store; report store -> history view on reconciliation
//! ticks.
//!
//! ## Ownership and lifetimes
//! The monitor loop owns its detection log and alert dispatcher; views own
//! their history snapshots. Callers drive every tick, so nothing here spawns
//! threads or timers.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`] where the caller must act;
//! per-tick analysis and side-effect failures degrade into log entries and
//! never stop the loop.
//!
//! ## Security and privacy notes
//! Auth tokens pass through as query material for the detection API only and
//! are never written into the detection log or status projections.

mod config;
mod monitor;
mod telemetry;
mod view;

pub use config::WatcherConfig;
pub use monitor::{MonitorLoop, PendingAnalysis, TickAction};
pub use telemetry::HealthTelemetry;
pub use view::{ReconciliationView, ViewPane};

use thiserror::Error;
use watcher_analysis::AnalysisError;
use watcher_auth::{AuthError, SessionStateMachine};
use watcher_capture::CaptureError;
use watcher_store::StoreError;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("WATCHER_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Returns `true` when the session allows remote detection sync.
pub fn session_allows_remote_sync(machine: &SessionStateMachine, now_ms: u64) -> bool {
    machine.access_token(now_ms).is_some()
}

/// Consolidated runtime status snapshot for simple UI projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Whether the monitoring stream is running.
    pub streaming: bool,
    /// Whether an analysis request is currently outstanding.
    pub analysis_in_flight: bool,
    /// Live detection log length.
    pub log_len: usize,
    /// History view length.
    pub history_len: usize,
    /// Whether an email notifier is configured.
    pub email_configured: bool,
    /// Total backend analysis calls, when telemetry has a snapshot.
    pub api_total_calls: Option<u64>,
}

/// Projects loop, view, and telemetry state into one flat snapshot.
pub fn project_runtime_status(
    monitor: &MonitorLoop,
    view: &ReconciliationView,
    telemetry: &HealthTelemetry,
) -> RuntimeStatus {
    RuntimeStatus {
        streaming: monitor.is_streaming(),
        analysis_in_flight: monitor.analysis_in_flight(),
        log_len: monitor.log().len(),
        history_len: view.history().len(),
        email_configured: monitor.email_configured(),
        api_total_calls: telemetry
            .snapshot()
            .map(|snapshot| snapshot.api_usage.total_calls),
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("config error: {0}")]
    Config(String),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Analysis contract or transport error.
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    /// Storage subsystem error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Auth subsystem error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}
