//! Integration tests for the bounded detection log under sustained polling.

mod common;

use watcher_core::ThreatLevel;

#[test]
fn detection_log_capacity_tests_evicts_oldest_beyond_capacity() {
    let mut harness = common::harness();

    for tick in 0..12_u64 {
        let now_ms = 1_000 + tick * 3_000;
        let description = format!("Observation {tick}");
        common::apply_scripted_tick(
            &mut harness,
            now_ms,
            common::fixture_assessment(ThreatLevel::Safe, &description, 0.5),
        );
    }

    let log = harness.monitor.log();
    assert_eq!(log.len(), log.capacity());
    assert_eq!(log.capacity(), 10);
    assert_eq!(log.entries()[0].text, "Observation 11");
}

#[test]
fn detection_log_capacity_tests_keeps_newest_first_order() {
    let mut harness = common::harness();

    for tick in 0..3_u64 {
        let now_ms = 1_000 + tick * 3_000;
        common::apply_scripted_tick(
            &mut harness,
            now_ms,
            common::fixture_assessment(ThreatLevel::Safe, &format!("Observation {tick}"), 0.5),
        );
    }

    let ids: Vec<u64> = harness
        .monitor
        .log()
        .entries()
        .iter()
        .map(|entry| entry.id)
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted, "entries should be newest first");
}
