// ======================================
// tests/integration/http_relay_tests.rs
// ======================================
//! HTTP relay against a live in-process backend
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use meeting_router_common::{Operation, Params, Server};
use router_lib::relay::{HttpRelay, ProtocolRelay, RelayError};
use tokio::net::TcpListener;

use crate::test_utils::FakeBackend;

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn relay() -> HttpRelay {
    HttpRelay::new(Duration::from_secs(2)).unwrap()
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/")
}

#[tokio::test]
async fn test_signed_call_succeeds() {
    let backend = FakeBackend::spawn("s3cr3t").await;
    let server = backend.server("bbb1");

    let payload = relay()
        .invoke(
            Operation::Create,
            &server,
            &params(&[("meetingID", "room 1"), ("name", "Daily & Weekly")]),
        )
        .await
        .unwrap();

    assert_eq!(payload["meetingID"], "room 1");
    assert_eq!(payload["name"], "Daily & Weekly");
    assert!(backend.hosts("room 1"));
}

#[tokio::test]
async fn test_backend_failure_is_protocol_error() {
    let backend = FakeBackend::spawn("s3cr3t").await;

    let err = relay()
        .invoke(
            Operation::GetMeetingInfo,
            &backend.server("bbb1"),
            &params(&[("meetingID", "ghost")]),
        )
        .await
        .unwrap_err();

    match err {
        RelayError::Protocol(err) => assert!(err.is_not_found()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_secret_rejected_by_backend() {
    let backend = FakeBackend::spawn("s3cr3t").await;
    let server = Server::new("bbb1", backend.url(), "not-the-secret");

    let err = relay()
        .invoke(Operation::GetMeetings, &server, &Params::new())
        .await
        .unwrap_err();

    match err {
        RelayError::Protocol(err) => assert_eq!(err.message_key, "checksumError"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_is_transport() {
    let url = serve(Router::new().route(
        "/api/{call}",
        get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    ))
    .await;

    let err = relay()
        .invoke(Operation::GetMeetings, &Server::new("bbb1", url, "s"), &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

#[tokio::test]
async fn test_undecodable_body_is_transport() {
    let url = serve(Router::new().route(
        "/api/{call}",
        get(|| async { "<response><returncode>SUCCESS</returncode></response>" }),
    ))
    .await;

    let err = relay()
        .invoke(Operation::GetMeetings, &Server::new("bbb1", url, "s"), &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let url = serve(Router::new().route(
        "/api/{call}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    ))
    .await;

    let relay = HttpRelay::new(Duration::from_millis(200)).unwrap();
    let err = relay
        .invoke(Operation::GetMeetings, &Server::new("bbb1", url, "s"), &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}
