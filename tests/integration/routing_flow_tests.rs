// ========================================
// tests/integration/routing_flow_tests.rs
// ========================================
//! End-to-end routing: inbound API -> engine -> HTTP relay -> fake backends
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::Router;
use router_lib::{
    api,
    config::{ServerSettings, Settings},
    AppState,
};

use crate::test_utils::{body_json, get, FakeBackend};

struct Cluster {
    router: Router,
    state: Arc<AppState>,
    alpha: FakeBackend,
    beta: FakeBackend,
}

fn server_settings(id: &str, backend: &FakeBackend, load: u64) -> ServerSettings {
    ServerSettings {
        id: id.to_string(),
        url: backend.url(),
        secret: backend.secret.clone(),
        enabled: true,
        load,
    }
}

/// Two backends; alpha starts less loaded than beta
async fn cluster() -> Cluster {
    let alpha = FakeBackend::spawn("alpha-secret").await;
    let beta = FakeBackend::spawn("beta-secret").await;

    let mut settings = Settings::default();
    settings.relay.timeout_secs = 2;
    settings.servers = vec![
        server_settings("alpha", &alpha, 0),
        server_settings("beta", &beta, 1),
    ];
    settings.validate().unwrap();

    let state = Arc::new(AppState::from_settings(settings).unwrap());
    let router = api::create_router(state.clone());

    Cluster {
        router,
        state,
        alpha,
        beta,
    }
}

#[tokio::test]
async fn test_meeting_lifecycle() {
    let c = cluster().await;

    let body = body_json(get(&c.router, "/bigbluebutton/api/create?meetingID=standup&name=Standup").await).await;
    assert_eq!(body["response"]["returncode"], "SUCCESS");
    assert!(c.alpha.hosts("standup"));
    assert!(!c.beta.hosts("standup"));

    let body = body_json(get(&c.router, "/bigbluebutton/api/getMeetingInfo?meetingID=standup").await).await;
    assert_eq!(body["response"]["meetingID"], "standup");

    let body = body_json(get(&c.router, "/bigbluebutton/api/isMeetingRunning?meetingID=standup").await).await;
    assert_eq!(body["response"]["running"], true);

    let body = body_json(get(&c.router, "/bigbluebutton/api/end?meetingID=standup").await).await;
    assert_eq!(body["response"]["returncode"], "SUCCESS");
    assert!(!c.alpha.hosts("standup"));
}

#[tokio::test]
async fn test_forgotten_meeting_is_reassigned() {
    let c = cluster().await;

    get(&c.router, "/bigbluebutton/api/create?meetingID=retro").await;
    assert!(c.alpha.hosts("retro"));

    // alpha restarts and loses the meeting
    c.alpha.forget("retro");

    let body = body_json(get(&c.router, "/bigbluebutton/api/getMeetingInfo?meetingID=retro").await).await;
    assert_eq!(body["response"]["returncode"], "FAILED");
    assert_eq!(body["response"]["messageKey"], "notFound");

    // alpha now carries load 1 and wins the tie-break against beta
    let selected = c.state.engine.select_available().await.unwrap();
    assert_eq!(selected.id, "alpha");

    // make beta the clear choice and recreate
    get(&c.router, "/bigbluebutton/api/create?meetingID=filler").await;
    let body = body_json(get(&c.router, "/bigbluebutton/api/create?meetingID=retro").await).await;
    assert_eq!(body["response"]["returncode"], "SUCCESS");
    assert!(c.beta.hosts("retro"));
}

#[tokio::test]
async fn test_get_meetings_spans_backends() {
    let c = cluster().await;

    let body = body_json(get(&c.router, "/bigbluebutton/api/getMeetings").await).await;
    assert_eq!(body["response"]["messageKey"], "noMeetings");

    get(&c.router, "/bigbluebutton/api/create?meetingID=one").await;
    get(&c.router, "/bigbluebutton/api/create?meetingID=two").await;
    get(&c.router, "/bigbluebutton/api/create?meetingID=three").await;
    assert!(c.alpha.hosts("one"));
    assert!(c.beta.hosts("two") || c.alpha.hosts("two"));

    let body = body_json(get(&c.router, "/bigbluebutton/api/getMeetings").await).await;
    let mut ids: Vec<String> = body["response"]["meetings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["meetingID"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["one", "three", "two"]);
}

#[tokio::test]
async fn test_join_redirect_is_signed_for_owner() {
    let c = cluster().await;
    get(&c.router, "/bigbluebutton/api/create?meetingID=demo").await;

    let response = get(&c.router, "/bigbluebutton/api/join?meetingID=demo&fullName=Ada%20L").await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let url = url::Url::parse(&location).unwrap();

    assert_eq!(url.port(), Some(c.alpha.addr.port()));
    assert!(c.alpha.verifies(&url));
    assert!(!c.beta.verifies(&url));
}

#[tokio::test]
async fn test_caller_checksum_is_not_forwarded() {
    let c = cluster().await;

    let response = get(&c.router, "/bigbluebutton/api/create?meetingID=p2&checksum=abc123").await;
    let body = body_json(response).await;
    assert_eq!(body["response"]["returncode"], "SUCCESS");
    assert!(c.alpha.hosts("p2"));

    let response =
        get(&c.router, "/bigbluebutton/api/join?meetingID=p2&fullName=Ada&checksum=abc123").await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location.matches("checksum=").count(), 1);
    assert!(!location.contains("abc123"));
    assert!(c.alpha.verifies(&url::Url::parse(&location).unwrap()));
}
