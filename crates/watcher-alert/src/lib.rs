#![warn(missing_docs)]
//! # watcher-alert
//!
//! ## Purpose
//! Decides side effects per threat assessment: report generation and email
//! notification, including all de-duplication policy.
//!
//! ## Responsibilities
//! - Generate exactly one report per qualifying capture and persist it.
//! - Run the email bootstrap/steady policy state machine.
//! - Map assessments to the flat email template parameter set.
//! - Convert every side-effect outcome into synthetic log entries.
//!
//! ## Data flow
//! Monitor loop -> [`AlertDispatcher::dispatch`] per assessment -> report
//! store save + optional email send -> synthetic [`DetectionEntry`] values
//! returned for log append.
//!
//! ## Ownership and lifetimes
//! The dispatcher owns its policy state; it is constructed on view mount and
//! dropped on unmount, so session-scoped flags never outlive the view.
//!
//! ## Error model
//! Notifier and store failures are non-fatal: they become synthetic entries
//! and the polling loop continues. Nothing is retried automatically.
//!
//! ## Security and privacy notes
//! Email parameters carry assessment metadata only; snapshot payloads go to
//! the report store, never into email text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use watcher_capture::{FrameSource, frame_to_base64};
use watcher_core::{
    CameraIdentity, DetectionEntry, Report, ThreatAssessment, format_timestamp_utc,
};
use watcher_store::{ReportStore, SaveOutcome};

/// Flat key/value parameter set handed to the email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailParams {
    /// Uppercase threat level label.
    pub threat_level: String,
    /// Description text.
    pub description: String,
    /// Confidence as a whole-number percentage, e.g. `92%`.
    pub confidence: String,
    /// Comma-joined object labels, or `None`.
    pub objects_detected: String,
    /// People count.
    pub people_count: u32,
    /// Recommended action text.
    pub recommended_action: String,
    /// RFC 3339 send timestamp.
    pub timestamp: String,
    /// Camera the detection originated from.
    pub camera_name: String,
}

impl EmailParams {
    /// Maps an assessment into template parameters.
    pub fn from_assessment(
        assessment: &ThreatAssessment,
        sent_at_ms: u64,
        camera_name: &str,
    ) -> Self {
        let objects_detected = if assessment.objects_detected.is_empty() {
            "None".to_string()
        } else {
            assessment.objects_detected.join(", ")
        };

        Self {
            threat_level: assessment.threat_level.label_upper().to_string(),
            description: assessment.description.clone(),
            confidence: format!("{:.0}%", assessment.confidence * 100.0),
            objects_detected,
            people_count: assessment.people_count,
            recommended_action: assessment.recommended_action.clone(),
            timestamp: format_timestamp_utc(sent_at_ms),
            camera_name: camera_name.to_string(),
        }
    }
}

/// Abstract email notifier dispatching a templated alert message.
pub trait EmailNotifier: Send + Sync {
    /// Sends one alert message.
    ///
    /// # Errors
    /// Returns [`AlertError::Send`] on dispatch failure; callers log the
    /// outcome and never retry automatically.
    fn send(&self, params: &EmailParams) -> Result<(), AlertError>;
}

/// Email notification policy phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailPolicyState {
    /// No email has been sent this session; the first assessment of any
    /// level triggers a bootstrap send to confirm notification wiring.
    AwaitingBootstrap,
    /// Bootstrap done; only qualifying assessments trigger sends.
    Steady,
}

/// Per-assessment side-effect policy engine.
///
/// Constructed on view mount with fresh session state; dropped on unmount.
pub struct AlertDispatcher {
    report_store: Arc<dyn ReportStore>,
    notifier: Option<Arc<dyn EmailNotifier>>,
    snapshot_source: Option<Arc<dyn FrameSource>>,
    camera: CameraIdentity,
    email_state: EmailPolicyState,
    min_send_interval_ms: u64,
    last_send_ms: Option<u64>,
    last_reported_capture: Option<u64>,
}

impl AlertDispatcher {
    /// Creates a dispatcher with fresh session state.
    ///
    /// `notifier: None` models an unconfigured Email Notifier; no sends occur
    /// and the bootstrap phase is held until one is configured.
    pub fn new(
        report_store: Arc<dyn ReportStore>,
        notifier: Option<Arc<dyn EmailNotifier>>,
        snapshot_source: Option<Arc<dyn FrameSource>>,
        camera: CameraIdentity,
    ) -> Self {
        Self {
            report_store,
            notifier,
            snapshot_source,
            camera,
            email_state: EmailPolicyState::AwaitingBootstrap,
            min_send_interval_ms: 0,
            last_send_ms: None,
            last_reported_capture: None,
        }
    }

    /// Sets a minimum interval between steady-state sends (0 disables the
    /// window; the bootstrap send is never windowed).
    pub fn with_min_send_interval(mut self, min_send_interval_ms: u64) -> Self {
        self.min_send_interval_ms = min_send_interval_ms;
        self
    }

    /// Returns the current email policy phase.
    pub fn email_state(&self) -> EmailPolicyState {
        self.email_state
    }

    /// Returns `true` when an email notifier is configured.
    pub fn email_configured(&self) -> bool {
        self.notifier.is_some()
    }

    /// Evaluates side effects for one assessment.
    ///
    /// Called exactly once per analysis result, in tick order. Returns the
    /// synthetic entries describing each side-effect outcome; the caller
    /// appends them to the detection log. All failures are absorbed here.
    pub fn dispatch(
        &mut self,
        assessment: &ThreatAssessment,
        capture_id_ms: u64,
        now_ms: u64,
    ) -> Vec<DetectionEntry> {
        let mut entries = Vec::new();

        if assessment.threat_level.is_qualifying()
            && self.last_reported_capture != Some(capture_id_ms)
        {
            self.last_reported_capture = Some(capture_id_ms);
            entries.push(self.generate_report(assessment, now_ms));
        }

        if let Some(entry) = self.evaluate_email(assessment, now_ms) {
            entries.push(entry);
        }

        entries
    }

    // Snapshot is captured fresh at qualification time; the analyzed frame is
    // only a fallback inside Report::from_assessment.
    fn generate_report(&self, assessment: &ThreatAssessment, now_ms: u64) -> DetectionEntry {
        let snapshot = self
            .snapshot_source
            .as_ref()
            .and_then(|source| source.capture_frame(now_ms))
            .map(|frame| frame_to_base64(&frame.bytes));

        let report = Report::from_assessment(assessment, now_ms, &self.camera, snapshot);
        match self.report_store.save(&report) {
            Ok(SaveOutcome::Saved) => {
                DetectionEntry::system(format!("Report generated ({})", report.id), now_ms)
            }
            Ok(SaveOutcome::Skipped) => {
                DetectionEntry::system("Report skipped by persistence policy", now_ms)
            }
            Err(error) => DetectionEntry::system(format!("Report save failed: {error}"), now_ms),
        }
    }

    fn evaluate_email(
        &mut self,
        assessment: &ThreatAssessment,
        now_ms: u64,
    ) -> Option<DetectionEntry> {
        let notifier = self.notifier.clone()?;

        match self.email_state {
            EmailPolicyState::AwaitingBootstrap => {
                // Transition happens regardless of send outcome; the
                // bootstrap send is never retried.
                self.email_state = EmailPolicyState::Steady;
            }
            EmailPolicyState::Steady => {
                if !assessment.threat_level.is_qualifying() {
                    return None;
                }
                if self.min_send_interval_ms > 0
                    && let Some(last) = self.last_send_ms
                    && now_ms.saturating_sub(last) < self.min_send_interval_ms
                {
                    return None;
                }
            }
        }

        self.last_send_ms = Some(now_ms);
        let params = EmailParams::from_assessment(assessment, now_ms, &self.camera.name);
        Some(match notifier.send(&params) {
            Ok(()) => DetectionEntry::system(
                format!("Alert email sent ({})", params.threat_level),
                now_ms,
            ),
            Err(error) => DetectionEntry::system(format!("Alert email failed: {error}"), now_ms),
        })
    }
}

/// Alert side-effect errors.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Message dispatch failed.
    #[error("email send failure: {0}")]
    Send(String),
}
