//! End-to-end scenario: a high-confidence danger detection.

mod common;

use watcher_core::{Priority, ThreatLevel};
use watcher_store::{HistoryFilter, ReportStore};

#[test]
fn danger_scenario_tests_produces_entry_report_and_email() {
    let mut harness = common::harness();
    let mut assessment =
        common::fixture_assessment(ThreatLevel::Danger, "Intruder near entrance", 0.92);
    assessment.objects_detected = vec!["person".to_string(), "crowbar".to_string()];
    assessment.people_count = 1;
    assessment.recommended_action = "Call security".to_string();

    common::apply_scripted_tick(&mut harness, 1_700_000_000_000, assessment);

    let entries = harness.monitor.log().entries();
    let detection = entries
        .iter()
        .find(|entry| entry.text == "Intruder near entrance")
        .expect("detection entry should be logged");
    assert_eq!(detection.threat_level(), Some(ThreatLevel::Danger));

    let reports = harness
        .reports
        .recent(10, HistoryFilter::All)
        .expect("report read should work");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].priority, Priority::High);
    assert_eq!(reports[0].camera_name, "Live Camera");
    assert!(
        reports[0].snapshot_image.is_some(),
        "fresh snapshot should be attached"
    );

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].threat_level, "DANGER");
    assert_eq!(sent[0].confidence, "92%");
    assert_eq!(sent[0].objects_detected, "person, crowbar");
    assert_eq!(sent[0].recommended_action, "Call security");
}
