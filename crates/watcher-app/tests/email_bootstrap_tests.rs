//! Integration tests for the email bootstrap/steady policy.

mod common;

use watcher_core::ThreatLevel;

#[test]
fn email_bootstrap_tests_first_assessment_sends_regardless_of_level() {
    let mut harness = common::harness();
    let sequence = [
        (ThreatLevel::Safe, "Quiet street"),
        (ThreatLevel::Safe, "Still quiet"),
        (ThreatLevel::Warning, "Loiterer by the gate"),
    ];

    for (tick, (level, description)) in sequence.iter().enumerate() {
        let now_ms = 1_000 + tick as u64 * 3_000;
        common::apply_scripted_tick(
            &mut harness,
            now_ms,
            common::fixture_assessment(*level, description, 0.8),
        );
    }

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 2, "bootstrap send plus one qualifying send");
    assert_eq!(sent[0].threat_level, "SAFE");
    assert_eq!(sent[1].threat_level, "WARNING");
}

#[test]
fn email_bootstrap_tests_send_outcomes_are_logged() {
    let mut harness = common::harness();

    common::apply_scripted_tick(
        &mut harness,
        1_000,
        common::fixture_assessment(ThreatLevel::Safe, "Quiet street", 0.8),
    );

    assert!(
        harness
            .monitor
            .log()
            .entries()
            .iter()
            .any(|entry| entry.text.starts_with("Alert email sent"))
    );
}
