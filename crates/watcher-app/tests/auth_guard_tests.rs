//! Integration tests for session gating of remote detection sync.

use watcher_app::session_allows_remote_sync;
use watcher_auth::{SessionStateMachine, SessionToken};

#[test]
fn auth_guard_tests_signed_out_blocks_remote_sync() {
    let machine = SessionStateMachine::new();
    assert!(!session_allows_remote_sync(&machine, 1_000));
}

#[test]
fn auth_guard_tests_valid_session_allows_remote_sync() {
    let mut machine = SessionStateMachine::new();
    machine.on_sign_in(SessionToken {
        access_token: "token-abc".to_string(),
        user_id: "user-1".to_string(),
        expires_at_ms: 10_000,
    });

    assert!(session_allows_remote_sync(&machine, 5_000));
}

#[test]
fn auth_guard_tests_expired_session_blocks_remote_sync() {
    let mut machine = SessionStateMachine::new();
    machine.on_sign_in(SessionToken {
        access_token: "token-abc".to_string(),
        user_id: "user-1".to_string(),
        expires_at_ms: 10_000,
    });
    machine.on_tick(20_000);

    assert!(!session_allows_remote_sync(&machine, 20_000));
}
