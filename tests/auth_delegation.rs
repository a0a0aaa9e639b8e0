//! End-to-end auth delegation: HTTP router → gate → real channel → stub authority.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tonic::Status;
use tower::ServiceExt;

use auth_relay::authority::{Authenticator, AuthorityConnection, ConnectionState, IdentityClaims};
use auth_relay::config::{AuthorityConfig, HttpConfig, SupervisorConfig};
use auth_relay::http::{router, AuthGate};

mod common;
use common::StubAuthority;

fn relay(authority: Arc<AuthorityConnection>) -> Router {
    let gate = AuthGate::new(
        Arc::clone(&authority) as Arc<dyn Authenticator>,
        Duration::from_secs(5),
    );
    let business = Router::new().route(
        "/api/v1/orders",
        get(|claims: IdentityClaims| async move { Json(json!({"owner": claims.user_id})) }),
    );
    router(&HttpConfig::default(), gate, authority, business)
}

fn connect(addr: std::net::SocketAddr) -> Arc<AuthorityConnection> {
    connect_with(addr, &SupervisorConfig::default())
}

fn connect_with(
    addr: std::net::SocketAddr,
    supervisor: &SupervisorConfig,
) -> Arc<AuthorityConnection> {
    let config = AuthorityConfig {
        address: addr.to_string(),
        connect_timeout_secs: 1,
        request_timeout_secs: 2,
        tls: None,
    };
    AuthorityConnection::connect(&config, supervisor, pending()).unwrap()
}

async fn get_json(app: Router, path: &str, authorization: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::get(path);
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }
    let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn accepted_credential_yields_claims() {
    let stub = StubAuthority::accepting("u1", "admin", true);
    let addr = common::spawn_authority(stub.clone()).await;
    let authority = connect(addr);
    let mut states = authority.subscribe();

    let (status, body) = get_json(relay(authority.clone()), "/api/v1/me", Some("Bearer abc")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(
        body["data"],
        json!({"user_id": "u1", "role": "admin", "is_verified": true})
    );
    assert_eq!(authority.state(), ConnectionState::Ready);
    assert!(states.has_changed().unwrap());
    assert_eq!(states.borrow_and_update().state, ConnectionState::Ready);
}

#[tokio::test]
async fn credential_and_request_id_reach_authority() {
    let stub = StubAuthority::accepting("u1", "admin", true);
    let addr = common::spawn_authority(stub.clone()).await;
    let app = relay(connect(addr));

    get_json(app.clone(), "/api/v1/orders", Some("Bearer abc")).await;
    get_json(app, "/api/v1/orders", Some("Bearer abc")).await;

    let calls = stub.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.authorization.as_deref(), Some("Bearer abc"));
        let id = uuid::Uuid::parse_str(&call.request_id).unwrap();
        assert_eq!(id.get_version_num(), 4);
    }
    assert_ne!(calls[0].request_id, calls[1].request_id);
}

#[tokio::test]
async fn business_routes_see_claims() {
    let addr = common::spawn_authority(StubAuthority::accepting("u42", "user", false)).await;

    let (status, body) = get_json(relay(connect(addr)), "/api/v1/orders", Some("Bearer t")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"owner": "u42"}));
}

#[tokio::test]
async fn missing_credential_is_not_forwarded() {
    let stub = StubAuthority::accepting("u1", "admin", true);
    let addr = common::spawn_authority(stub.clone()).await;

    let (status, body) = get_json(relay(connect(addr)), "/api/v1/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"status": false, "message": "Authorization header is missing."})
    );
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn denial_and_unreachable_authority_are_indistinguishable() {
    let denying = common::spawn_authority(StubAuthority::denying(Status::unauthenticated(
        "token expired",
    )))
    .await;
    let (denied_status, denied_body) =
        get_json(relay(connect(denying)), "/api/v1/me", Some("Bearer abc")).await;

    let nowhere = common::unused_addr().await;
    let authority = connect(nowhere);
    let (down_status, down_body) =
        get_json(relay(authority.clone()), "/api/v1/me", Some("Bearer abc")).await;

    assert_eq!(denied_status, StatusCode::UNAUTHORIZED);
    assert_eq!(down_status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied_body, down_body);
    assert_eq!(denied_body["message"], "Invalid or expired token.");
    assert_ne!(authority.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn closed_connection_denies() {
    let addr = common::spawn_authority(StubAuthority::accepting("u1", "admin", true)).await;
    let authority = connect(addr);
    authority.close();

    let (status, body) = get_json(relay(authority.clone()), "/api/v1/me", Some("Bearer abc")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token.");
    assert!(!authority.is_available());
}

#[tokio::test]
async fn slow_authority_is_cut_off() {
    let stub = StubAuthority::accepting("u1", "admin", true).with_delay(Duration::from_secs(30));
    let addr = common::spawn_authority(stub).await;

    let started = std::time::Instant::now();
    let (status, _) = get_json(relay(connect(addr)), "/api/v1/me", Some("Bearer abc")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn health_is_unguarded_and_reports_authority() {
    let nowhere = common::unused_addr().await;

    let (status, body) = get_json(relay(connect(nowhere)), "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["authority"]["available"], true);
    assert!(body["authority"]["state"].is_string());
}

#[tokio::test]
async fn authority_started_late_is_picked_up_without_traffic() {
    let addr = common::unused_addr().await;
    let supervisor = SupervisorConfig {
        backoff_step_secs: 1,
        backoff_cap_secs: 2,
        ..SupervisorConfig::default()
    };
    let authority = connect_with(addr, &supervisor);
    let mut states = authority.subscribe();

    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| s.state == ConnectionState::TransientFailure),
    )
    .await
    .unwrap()
    .unwrap();

    let stub = StubAuthority::accepting("u1", "admin", true);
    common::spawn_authority_on(addr, stub.clone()).await;

    tokio::time::timeout(
        Duration::from_secs(10),
        states.wait_for(|s| s.state == ConnectionState::Ready),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(stub.calls().is_empty());

    let (status, body) = get_json(relay(authority), "/api/v1/me", Some("Bearer abc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], "u1");
    assert_eq!(stub.calls().len(), 1);
}
