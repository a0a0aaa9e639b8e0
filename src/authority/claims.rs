//! Identity claims returned by the authority.

use serde::{Deserialize, Serialize};

use crate::authority::proto::AuthResponse;

/// Verified identity of the caller, attached to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub user_id: String,
    pub role: String,
    pub is_verified: bool,
}

impl From<AuthResponse> for IdentityClaims {
    fn from(response: AuthResponse) -> Self {
        Self {
            user_id: response.user_id,
            role: response.role,
            is_verified: response.is_verified,
        }
    }
}
