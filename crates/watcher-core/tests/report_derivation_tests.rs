//! Tests report derivation from qualifying assessments.

use watcher_core::{
    CameraIdentity, Priority, Report, ReportStatus, ThreatAssessment, ThreatLevel,
};

fn danger_assessment() -> ThreatAssessment {
    ThreatAssessment {
        threat_level: ThreatLevel::Danger,
        description: "Intruder near entrance".to_string(),
        confidence: 0.92,
        objects_detected: vec!["person".to_string(), "bag".to_string()],
        people_count: 1,
        recommended_action: "Alert security personnel".to_string(),
        details: vec![],
        captured_image: Some("analyzed-frame".to_string()),
    }
}

#[test]
fn report_derivation_tests_copy_assessment_fields() {
    let camera = CameraIdentity::default();
    let report = Report::from_assessment(&danger_assessment(), 1_700_000_000_000, &camera, None);

    assert_eq!(report.id, "report-1700000000000");
    assert_eq!(report.threat_level, ThreatLevel::Danger);
    assert_eq!(report.priority, Priority::High);
    assert_eq!(report.status, ReportStatus::Active);
    assert_eq!(report.camera_name, "Live Camera");
    assert_eq!(report.camera_id, "live-camera-1");
    assert_eq!(report.people_count, 1);
}

#[test]
fn report_derivation_tests_prefer_fresh_snapshot() {
    let camera = CameraIdentity::default();

    let with_fresh = Report::from_assessment(
        &danger_assessment(),
        1_000,
        &camera,
        Some("fresh-snapshot".to_string()),
    );
    assert_eq!(with_fresh.snapshot_image.as_deref(), Some("fresh-snapshot"));

    let with_fallback = Report::from_assessment(&danger_assessment(), 1_000, &camera, None);
    assert_eq!(
        with_fallback.snapshot_image.as_deref(),
        Some("analyzed-frame")
    );
}
