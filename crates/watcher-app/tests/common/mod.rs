//! Shared fixtures for app integration tests.

use std::sync::{Arc, Mutex};

use watcher_alert::{AlertDispatcher, AlertError, EmailNotifier, EmailParams};
use watcher_app::MonitorLoop;
use watcher_capture::SyntheticFrameSource;
use watcher_core::{CameraIdentity, ThreatAssessment, ThreatLevel};
use watcher_store::{DetectionLog, LocalReportStore, MemoryStore};

/// Email notifier that records every send and optionally fails.
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailParams>>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailParams> {
        self.sent.lock().expect("send lock should work").clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().expect("send lock should work").len()
    }
}

impl EmailNotifier for RecordingNotifier {
    fn send(&self, params: &EmailParams) -> Result<(), AlertError> {
        self.sent
            .lock()
            .expect("send lock should work")
            .push(params.clone());
        if self.fail {
            Err(AlertError::Send("simulated send failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Fully wired monitor loop over in-memory backends.
#[allow(dead_code)]
pub struct Harness {
    pub source: Arc<SyntheticFrameSource>,
    pub backing: Arc<MemoryStore>,
    pub reports: Arc<LocalReportStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub monitor: MonitorLoop,
}

/// Builds a started monitor loop with a recording notifier.
#[allow(dead_code)]
pub fn harness() -> Harness {
    let source = Arc::new(SyntheticFrameSource::new());
    let backing = Arc::new(MemoryStore::new());
    let reports = Arc::new(LocalReportStore::new(backing.clone()));
    let notifier = Arc::new(RecordingNotifier::new());

    let log = DetectionLog::open_default(backing.clone()).expect("default log should open");
    let dispatcher = AlertDispatcher::new(
        reports.clone(),
        Some(notifier.clone() as Arc<dyn EmailNotifier>),
        Some(source.clone() as Arc<dyn watcher_capture::FrameSource>),
        CameraIdentity::default(),
    );

    let mut monitor = MonitorLoop::new(source.clone(), log, dispatcher);
    monitor.start_stream();

    Harness {
        source,
        backing,
        reports,
        notifier,
        monitor,
    }
}

/// Deterministic assessment fixture.
#[allow(dead_code)]
pub fn fixture_assessment(
    level: ThreatLevel,
    description: &str,
    confidence: f64,
) -> ThreatAssessment {
    ThreatAssessment {
        threat_level: level,
        description: description.to_string(),
        confidence,
        objects_detected: vec!["person".to_string()],
        people_count: 1,
        recommended_action: "Continue monitoring".to_string(),
        details: vec![],
        captured_image: None,
    }
}

/// Runs one full tick through the harness monitor with a scripted outcome.
#[allow(dead_code)]
pub fn apply_scripted_tick(harness: &mut Harness, now_ms: u64, assessment: ThreatAssessment) {
    match harness.monitor.poll_tick(now_ms) {
        watcher_app::TickAction::Dispatch(pending) => {
            harness.monitor.apply_analysis(pending, Ok(assessment), now_ms);
        }
        other => panic!("expected analysis dispatch at {now_ms}, got {other:?}"),
    }
}
