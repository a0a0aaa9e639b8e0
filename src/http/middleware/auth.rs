//! Auth delegation gate.
//!
//! Extracts the bearer credential, forwards it to the Authentication
//! Authority and attaches the returned [`IdentityClaims`] to the request.
//! Every failure is a 401 before any business handler runs.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::authority::{Authenticator, IdentityClaims};
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::resilience::with_deadline;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("Authorization header is missing.")]
    MissingCredential,

    #[error("Bearer token missing or invalid format.")]
    MalformedCredential,

    #[error("Invalid or expired token.")]
    AuthenticationFailed,
}

impl AuthRejection {
    fn outcome(self) -> &'static str {
        match self {
            AuthRejection::MissingCredential => "missing",
            AuthRejection::MalformedCredential => "malformed",
            AuthRejection::AuthenticationFailed => "failed",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::failure(self.to_string())),
        )
            .into_response()
    }
}

/// Return the full `Authorization` value if it is a well-formed bearer credential.
pub fn bearer_credential(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let value = match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthRejection::MissingCredential),
    };

    let value = value
        .to_str()
        .map_err(|_| AuthRejection::MalformedCredential)?;

    match value.strip_prefix(BEARER_PREFIX).and_then(|token| token.chars().next()) {
        Some(first) if !first.is_whitespace() => Ok(value),
        _ => Err(AuthRejection::MalformedCredential),
    }
}

/// Gate state: who to ask, and how long to wait for the answer.
#[derive(Clone)]
pub struct AuthGate {
    authority: Arc<dyn Authenticator>,
    timeout: Duration,
}

impl AuthGate {
    pub fn new(authority: Arc<dyn Authenticator>, timeout: Duration) -> Self {
        Self { authority, timeout }
    }

    /// Decide one request.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthRejection> {
        let result = self.delegate(headers).await;
        metrics::record_auth_outcome(match result {
            Ok(_) => "accepted",
            Err(rejection) => rejection.outcome(),
        });
        result
    }

    async fn delegate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthRejection> {
        let authorization = bearer_credential(headers).inspect_err(|rejection| {
            tracing::debug!(reason = rejection.outcome(), "Request rejected before delegation");
        })?;

        let request_id = Uuid::new_v4();
        let call = self.authority.is_authenticated(authorization, request_id);

        match with_deadline(self.timeout, call).await {
            Ok(Ok(claims)) => {
                tracing::debug!(%request_id, user_id = %claims.user_id, "Credential accepted");
                Ok(claims)
            }
            Ok(Err(err)) if err.is_denial() => {
                tracing::info!(%request_id, reason = "denied", error = %err, "Authority denied credential");
                Err(AuthRejection::AuthenticationFailed)
            }
            Ok(Err(err)) => {
                tracing::warn!(%request_id, reason = "unavailable", error = %err, "Authority call failed");
                Err(AuthRejection::AuthenticationFailed)
            }
            Err(elapsed) => {
                tracing::warn!(%request_id, reason = "timeout", error = %elapsed, "Authority call timed out");
                Err(AuthRejection::AuthenticationFailed)
            }
        }
    }
}

/// Axum middleware: authenticate, attach claims, continue.
pub async fn require_identity(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.authenticate(request.headers()).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Claims for the current request, as attached by [`require_identity`].
impl<S> FromRequestParts<S> for IdentityClaims
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityClaims>()
            .cloned()
            .ok_or(AuthRejection::AuthenticationFailed)
    }
}
