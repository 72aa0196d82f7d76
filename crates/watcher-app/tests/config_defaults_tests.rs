//! Integration tests for configuration parsing and validation.

use watcher_app::{AppError, WatcherConfig};

#[test]
fn config_defaults_tests_empty_document_yields_defaults() {
    let config = WatcherConfig::from_json("{}").expect("empty config should parse");

    assert_eq!(config.analysis_interval_ms, 3_000);
    assert_eq!(config.history_refresh_interval_ms, 30_000);
    assert_eq!(config.health_refresh_interval_ms, 30_000);
    assert_eq!(config.detection_log_capacity, 10);
    assert_eq!(config.detection_log_key, "liveDetections");
    assert_eq!(config.report_store_key, "threatReports");
    assert_eq!(config.camera_name, "Live Camera");
    assert!(!config.persist_safe);
    assert_eq!(config.min_confidence, 0.7);
}

#[test]
fn config_defaults_tests_overrides_apply() {
    let config = WatcherConfig::from_json(
        r#"{
            "analysis_interval_ms": 5000,
            "camera_name": "Back Door",
            "persist_safe": true
        }"#,
    )
    .expect("override config should parse");

    assert_eq!(config.analysis_interval_ms, 5_000);
    assert_eq!(config.camera().name, "Back Door");
    assert!(config.store_policy().persist_safe);
}

#[test]
fn config_defaults_tests_rejects_zero_interval() {
    let error = WatcherConfig::from_json(r#"{"analysis_interval_ms": 0}"#)
        .expect_err("zero interval should be rejected");
    assert!(matches!(error, AppError::Config(_)));
}

#[test]
fn config_defaults_tests_rejects_unknown_fields() {
    let error = WatcherConfig::from_json(r#"{"anaylsis_interval_ms": 3000}"#)
        .expect_err("typoed field should be rejected");
    assert!(matches!(error, AppError::Config(_)));
}

#[test]
fn config_defaults_tests_rejects_bad_analysis_endpoint() {
    let error = WatcherConfig::from_json(r#"{"analysis_endpoint": "http://localhost:9000/wrong"}"#)
        .expect_err("wrong path should be rejected");
    assert!(matches!(error, AppError::Config(_)));
}
