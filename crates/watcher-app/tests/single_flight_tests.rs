//! Integration tests for single-flight analysis dispatch.

mod common;

use watcher_app::TickAction;
use watcher_core::ThreatLevel;

#[test]
fn single_flight_tests_drops_ticks_while_analysis_is_outstanding() {
    let mut harness = common::harness();

    let pending = match harness.monitor.poll_tick(1_000) {
        TickAction::Dispatch(pending) => pending,
        other => panic!("first tick should dispatch, got {other:?}"),
    };

    // Analysis is slow: two more polling ticks elapse before it returns.
    assert!(matches!(harness.monitor.poll_tick(4_000), TickAction::Skipped));
    assert!(matches!(harness.monitor.poll_tick(7_000), TickAction::Skipped));
    assert_eq!(harness.source.frames_produced(), 1);

    harness.monitor.apply_analysis(
        pending,
        Ok(common::fixture_assessment(
            ThreatLevel::Safe,
            "All clear",
            0.6,
        )),
        7_500,
    );

    assert!(!harness.monitor.analysis_in_flight());
    assert!(matches!(
        harness.monitor.poll_tick(10_000),
        TickAction::Dispatch(_)
    ));
}

#[test]
fn single_flight_tests_reports_no_frame_when_source_detached() {
    let mut harness = common::harness();

    harness.source.set_active(false);
    assert!(matches!(harness.monitor.poll_tick(1_000), TickAction::NoFrame));
    assert!(!harness.monitor.analysis_in_flight());
}
