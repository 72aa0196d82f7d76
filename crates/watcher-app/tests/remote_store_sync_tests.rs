//! Remote detection-history store: policy gating, save request shape, and
//! history round-trips over a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use watcher_core::{CameraIdentity, Report, ThreatAssessment, ThreatLevel};
use watcher_store::{
    ApiReply, DetectionApiTransport, HistoryFilter, RemoteReportStore, ReportStore, SaveOutcome,
    StoreError, StorePolicy, demo_report, detection_idempotency_key,
};

const ENDPOINT: &str = "http://127.0.0.1:9000/api/threat-detections";

/// Records every request and replays scripted replies in order.
struct ScriptedDetectionApi {
    replies: Mutex<VecDeque<ApiReply>>,
    posts: Mutex<Vec<(String, String)>>,
    gets: Mutex<Vec<String>>,
}

impl ScriptedDetectionApi {
    fn with_replies(replies: Vec<ApiReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            posts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
        }
    }

    fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().expect("post lock should work").clone()
    }

    fn gets(&self) -> Vec<String> {
        self.gets.lock().expect("get lock should work").clone()
    }

    fn next_reply(&self) -> Result<ApiReply, StoreError> {
        self.replies
            .lock()
            .expect("reply lock should work")
            .pop_front()
            .ok_or_else(|| StoreError::Transport("no scripted reply left".to_string()))
    }
}

impl DetectionApiTransport for ScriptedDetectionApi {
    fn post_json(&self, endpoint: &str, body: &str) -> Result<ApiReply, StoreError> {
        self.posts
            .lock()
            .expect("post lock should work")
            .push((endpoint.to_string(), body.to_string()));
        self.next_reply()
    }

    fn get(&self, url: &str) -> Result<ApiReply, StoreError> {
        self.gets
            .lock()
            .expect("get lock should work")
            .push(url.to_string());
        self.next_reply()
    }
}

fn reply(status: u16, body: &str) -> ApiReply {
    ApiReply {
        status,
        body: body.to_string(),
    }
}

fn store(
    auth_token: &str,
    policy: StorePolicy,
    transport: Arc<ScriptedDetectionApi>,
) -> RemoteReportStore {
    RemoteReportStore::new(
        ENDPOINT,
        auth_token,
        CameraIdentity::default(),
        policy,
        transport,
    )
}

fn report(level: ThreatLevel, confidence: f64, timestamp_ms: u64) -> Report {
    let assessment = ThreatAssessment {
        threat_level: level,
        description: "Observed activity".to_string(),
        confidence,
        objects_detected: vec!["person".to_string()],
        people_count: 1,
        recommended_action: "Continue monitoring".to_string(),
        details: vec![],
        captured_image: None,
    };
    Report::from_assessment(&assessment, timestamp_ms, &CameraIdentity::default(), None)
}

#[test]
fn remote_store_policy_skips_non_qualifying_reports_without_traffic() {
    let transport = Arc::new(ScriptedDetectionApi::with_replies(vec![]));
    let store = store("token", StorePolicy::default(), transport.clone());

    let outcome = store
        .save(&report(ThreatLevel::Safe, 0.9, 1_000))
        .expect("policy skip is not an error");
    assert_eq!(outcome, SaveOutcome::Skipped);

    let outcome = store
        .save(&report(ThreatLevel::Danger, 0.5, 2_000))
        .expect("policy skip is not an error");
    assert_eq!(outcome, SaveOutcome::Skipped);

    assert!(transport.posts().is_empty());
}

#[test]
fn remote_store_posts_save_request_with_idempotency_key() {
    let transport = Arc::new(ScriptedDetectionApi::with_replies(vec![reply(
        200,
        r#"{"success":true}"#,
    )]));
    let store = store("secret-token", StorePolicy::default(), transport.clone());

    let saved = demo_report(1_000);
    let outcome = store.save(&saved).expect("save should succeed");
    assert_eq!(outcome, SaveOutcome::Saved);

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, ENDPOINT);

    let body: serde_json::Value =
        serde_json::from_str(&posts[0].1).expect("request body should be JSON");
    assert_eq!(body["auth_token"], "secret-token");
    assert_eq!(body["camera_name"], "Live Camera");
    assert_eq!(
        body["idempotency_key"],
        serde_json::Value::String(detection_idempotency_key(
            saved.timestamp_ms,
            &saved.description
        ))
    );
    assert_eq!(body["detection"]["threat_level"], "warning");
    assert_eq!(body["detection"]["threat_detected"], true);
    assert_eq!(body["detection"]["timestamp_ms"], 1_000);
}

#[test]
fn remote_store_surfaces_status_and_contract_failures() {
    let transport = Arc::new(ScriptedDetectionApi::with_replies(vec![
        reply(500, "internal error"),
        reply(200, r#"{"success":false,"message":"quota exceeded"}"#),
    ]));
    let store = store("token", StorePolicy::default(), transport);

    let error = store
        .save(&report(ThreatLevel::Danger, 0.9, 1_000))
        .expect_err("non-2xx status should fail");
    assert!(matches!(error, StoreError::Backend(_)));

    let error = store
        .save(&report(ThreatLevel::Danger, 0.9, 2_000))
        .expect_err("success=false should fail");
    match error {
        StoreError::Contract(message) => assert_eq!(message, "quota exceeded"),
        other => panic!("expected contract error, got {other:?}"),
    }

    assert!(matches!(
        store.delete("report-1000"),
        Err(StoreError::Unsupported(_))
    ));
    assert!(matches!(store.clear(), Err(StoreError::Unsupported(_))));
}

#[test]
fn remote_store_history_round_trip_encodes_auth_token() {
    let history_body = r#"{
        "success": true,
        "detections": [
            {
                "id": "det-1",
                "camera_name": "Lobby Cam",
                "threat_level": "danger",
                "description": "Intruder near entrance",
                "confidence": 0.9,
                "timestamp_ms": 5000
            },
            {
                "id": "det-2",
                "threat_level": "safe",
                "description": "Quiet scene",
                "confidence": 0.8,
                "timestamp_ms": 6000
            }
        ]
    }"#;
    let transport = Arc::new(ScriptedDetectionApi::with_replies(vec![
        reply(200, history_body),
        reply(200, history_body),
    ]));
    let store = store("abc&123#x", StorePolicy::default(), transport.clone());

    let all = store
        .recent(10, HistoryFilter::All)
        .expect("history fetch should succeed");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "det-1");
    assert_eq!(all[0].camera_name, "Lobby Cam");
    assert_eq!(all[1].id, "det-2");
    assert_eq!(all[1].camera_name, "Live Camera");

    let threats = store
        .recent(10, HistoryFilter::ThreatsOnly)
        .expect("history fetch should succeed");
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0].threat_level, ThreatLevel::Danger);

    let gets = transport.gets();
    assert_eq!(gets.len(), 2);
    assert!(gets[0].contains("auth_token=abc%26123%23x"));
    assert!(gets[0].contains("limit=10"));
}
