//! HTTP router assembly.
//!
//! # Responsibilities
//! - `/health`, unguarded, reporting the authority connection
//! - `/api/v1/me` and caller-supplied business routes behind the auth gate
//! - Wire up middleware (timeout, request ID, optional request tracing)

use std::sync::Arc;

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::authority::{AuthorityConnection, ConnectionSnapshot, IdentityClaims};
use crate::config::HttpConfig;
use crate::http::middleware::auth::{require_identity, AuthGate};
use crate::http::response::ApiResponse;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: bool,
    authority: ConnectionSnapshot,
}

/// Build the inbound router. Every route in `guarded` runs behind the gate.
#[allow(deprecated)]
pub fn router(
    config: &HttpConfig,
    gate: AuthGate,
    authority: Arc<AuthorityConnection>,
    guarded: Router,
) -> Router {
    let guarded = Router::new()
        .route("/api/v1/me", get(me))
        .merge(guarded)
        .route_layer(from_fn_with_state(gate, require_identity));

    let mut app = Router::new()
        .route("/health", get(health))
        .with_state(authority)
        .merge(guarded)
        .layer(TimeoutLayer::new(config.request_timeout()));

    if config.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health(State(authority): State<Arc<AuthorityConnection>>) -> Json<HealthBody> {
    Json(HealthBody {
        status: true,
        authority: authority.snapshot(),
    })
}

async fn me(claims: IdentityClaims) -> Json<ApiResponse<IdentityClaims>> {
    Json(ApiResponse::success("Authenticated.", claims))
}
