//! Delegated `IsAuthenticated` call.

use async_trait::async_trait;
use tonic::metadata::AsciiMetadataValue;
use tonic::{Code, Status};
use uuid::Uuid;

use crate::authority::claims::IdentityClaims;
use crate::authority::connection::AuthorityConnection;
use crate::authority::proto::auth_service_client::AuthServiceClient;
use crate::authority::proto::AuthRequest;

/// Metadata key carrying the caller's credential.
pub const AUTHORIZATION_METADATA: &str = "authorization";

/// Why a delegated check did not produce claims.
///
/// Callers of the gate never see the difference; operators do.
#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    #[error("authority connection is closed")]
    Closed,

    #[error("credential cannot be carried as gRPC metadata")]
    InvalidMetadata,

    #[error("authority rejected the credential: {}", .0.message())]
    Denied(Status),

    #[error("authority call failed ({:?}): {}", .0.code(), .0.message())]
    Transport(Status),
}

impl DelegationError {
    /// Classify a gRPC status as an explicit denial or a transport problem.
    pub fn from_status(status: Status) -> Self {
        match status.code() {
            Code::Unauthenticated
            | Code::PermissionDenied
            | Code::InvalidArgument
            | Code::NotFound
            | Code::FailedPrecondition => DelegationError::Denied(status),
            _ => DelegationError::Transport(status),
        }
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, DelegationError::Denied(_) | DelegationError::InvalidMetadata)
    }
}

/// Something that can answer "is this credential valid".
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Forward `authorization` (the full header value) for verification.
    async fn is_authenticated(
        &self,
        authorization: &str,
        request_id: Uuid,
    ) -> Result<IdentityClaims, DelegationError>;
}

#[async_trait]
impl Authenticator for AuthorityConnection {
    async fn is_authenticated(
        &self,
        authorization: &str,
        request_id: Uuid,
    ) -> Result<IdentityClaims, DelegationError> {
        let channel = self.channel().ok_or(DelegationError::Closed)?;
        let credential = AsciiMetadataValue::try_from(authorization)
            .map_err(|_| DelegationError::InvalidMetadata)?;

        let mut request = tonic::Request::new(AuthRequest {
            request_id: request_id.to_string(),
        });
        request
            .metadata_mut()
            .insert(AUTHORIZATION_METADATA, credential);
        request.set_timeout(self.request_timeout());

        let mut client = AuthServiceClient::new(channel);
        let response = client
            .is_authenticated(request)
            .await
            .map_err(DelegationError::from_status)?;

        Ok(IdentityClaims::from(response.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_codes_are_classified() {
        let denied = DelegationError::from_status(Status::unauthenticated("token expired"));
        assert!(denied.is_denial());

        let unreachable = DelegationError::from_status(Status::unavailable("connection refused"));
        assert!(!unreachable.is_denial());

        let deadline = DelegationError::from_status(Status::deadline_exceeded("slow"));
        assert!(!deadline.is_denial());
    }

    #[test]
    fn error_messages_name_the_cause() {
        let err = DelegationError::from_status(Status::unavailable("connection refused"));
        assert_eq!(
            err.to_string(),
            "authority call failed (Unavailable): connection refused"
        );
    }
}
