#![warn(missing_docs)]
//! # watcher-app binary
//!
//! Desktop entry point for watcher. Without a live backend it drives one
//! short monitoring session against a canned analysis service and prints the
//! resulting detection log and runtime status.

use std::sync::{Arc, Mutex};

use watcher_alert::AlertDispatcher;
use watcher_analysis::{AnalysisClient, AnalysisError, AnalysisTransport, HttpReply};
use watcher_app::{
    AppError, HealthTelemetry, MonitorLoop, ReconciliationView, WatcherConfig,
    project_runtime_status,
};
use watcher_capture::{FrameSource, SyntheticFrameSource};
use watcher_store::{DetectionLog, HistoryFilter, LocalReportStore, MemoryStore};

/// Canned analysis service cycling safe and warning assessments.
struct DemoAnalysisService {
    calls: Mutex<u64>,
}

impl DemoAnalysisService {
    fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    fn next_call(&self) -> u64 {
        match self.calls.lock() {
            Ok(mut calls) => {
                *calls += 1;
                *calls
            }
            Err(_) => 0,
        }
    }

    fn total_calls(&self) -> u64 {
        self.calls.lock().map(|calls| *calls).unwrap_or(0)
    }
}

impl AnalysisTransport for DemoAnalysisService {
    fn post_frame(&self, _endpoint: &str, _frame_jpeg: &[u8]) -> Result<HttpReply, AnalysisError> {
        let body = if self.next_call() % 3 == 0 {
            r#"{"success":true,"analysis":{"threat_level":"warning","description":"Person lingering near entrance","confidence":0.82,"objects_detected":["person"],"people_count":1,"recommended_action":"Review footage"}}"#
        } else {
            r#"{"success":true,"analysis":{"threat_level":"safe","description":"No threats detected","confidence":0.95}}"#
        };
        Ok(HttpReply {
            status: 200,
            body: body.to_string(),
        })
    }

    fn get(&self, _endpoint: &str) -> Result<HttpReply, AnalysisError> {
        Ok(HttpReply {
            status: 200,
            body: format!(
                r#"{{"api_usage":{{"total_calls":{},"mode":"demo"}}}}"#,
                self.total_calls()
            ),
        })
    }
}

/// CLI entry point.
fn main() {
    env_logger::init();
    if let Err(error) = run() {
        eprintln!("watcher-app failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let config = WatcherConfig::default();
    println!("watcher-app {}", watcher_app::app_version());
    println!("analysis_endpoint={}", config.analysis_endpoint);

    let service = Arc::new(DemoAnalysisService::new());
    let client = AnalysisClient::new(&config.analysis_endpoint, service.clone())?;

    let source = Arc::new(SyntheticFrameSource::new());
    let backing = Arc::new(MemoryStore::new());
    let reports = Arc::new(LocalReportStore::with_namespace(
        backing.clone(),
        config.report_store_key.clone(),
        watcher_store::REPORT_STORE_CAP,
    ));

    let log = DetectionLog::open(
        backing,
        config.detection_log_capacity,
        config.detection_log_key.clone(),
    )?;
    let dispatcher = AlertDispatcher::new(
        reports.clone(),
        None,
        Some(source.clone() as Arc<dyn FrameSource>),
        config.camera(),
    )
    .with_min_send_interval(config.email_min_send_interval_ms);

    let mut monitor = MonitorLoop::new(source, log, dispatcher);
    let mut view = ReconciliationView::new(
        config.history_refresh_interval_ms,
        watcher_store::REPORT_STORE_CAP,
    );
    let mut telemetry = HealthTelemetry::new(
        &config.health_endpoint,
        config.health_refresh_interval_ms,
    );

    monitor.start_stream();
    let mut now_ms = 0;
    for _ in 0..12 {
        monitor.run_tick(&client, now_ms);
        view.refresh_history(reports.as_ref(), now_ms, HistoryFilter::All);
        telemetry.refresh(service.as_ref(), now_ms);
        now_ms += config.analysis_interval_ms;
    }
    monitor.stop_stream();

    for entry in monitor.log().entries() {
        println!("[{}] {}", entry.id, entry.text);
    }

    let status = project_runtime_status(&monitor, &view, &telemetry);
    println!(
        "log_len={} history_len={} api_total_calls={:?}",
        status.log_len, status.history_len, status.api_total_calls
    );

    Ok(())
}
