//! Wire types for `auth.AuthService`.

/// Request for `IsAuthenticated`. The credential travels as metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRequest {
    #[prost(string, tag = "1")]
    pub request_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthResponse {
    #[prost(string, tag = "1")]
    pub user_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub role: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub is_verified: bool,
}

include!(concat!(env!("OUT_DIR"), "/auth.AuthService.rs"));
