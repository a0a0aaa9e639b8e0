//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

use auth_relay::authority::proto::auth_service_server::{AuthService, AuthServiceServer};
use auth_relay::authority::proto::{AuthRequest, AuthResponse};
use auth_relay::config::RelayConfig;

/// One call as the stub authority saw it.
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub authorization: Option<String>,
    pub request_id: String,
}

/// Programmable Authentication Authority.
#[derive(Clone)]
pub struct StubAuthority {
    reply: Result<AuthResponse, Status>,
    delay: Duration,
    calls: Arc<Mutex<Vec<SeenCall>>>,
}

impl StubAuthority {
    pub fn accepting(user_id: &str, role: &str, is_verified: bool) -> Self {
        Self::replying(Ok(AuthResponse {
            user_id: user_id.into(),
            role: role.into(),
            is_verified,
        }))
    }

    pub fn denying(status: Status) -> Self {
        Self::replying(Err(status))
    }

    fn replying(reply: Result<AuthResponse, Status>) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_server(self) -> AuthServiceServer<Self> {
        AuthServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl AuthService for StubAuthority {
    async fn is_authenticated(
        &self,
        request: Request<AuthRequest>,
    ) -> Result<Response<AuthResponse>, Status> {
        let authorization = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.calls.lock().unwrap().push(SeenCall {
            authorization,
            request_id: request.into_inner().request_id,
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map(Response::new)
    }
}

/// Serve `stub` on an ephemeral local port.
pub async fn spawn_authority(stub: StubAuthority) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve_authority(listener, stub)
}

/// Serve `stub` on a fixed address, e.g. one a client already targets.
pub async fn spawn_authority_on(addr: SocketAddr, stub: StubAuthority) -> SocketAddr {
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_authority(listener, stub)
}

fn serve_authority(listener: TcpListener, stub: StubAuthority) -> SocketAddr {
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(stub.into_server())
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    addr
}

/// A local address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config with both listeners on ephemeral ports and short timers.
pub fn relay_config(authority: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.http.bind_address = "127.0.0.1:0".into();
    config.rpc.bind_address = "127.0.0.1:0".into();
    config.authority.address = authority.to_string();
    config.authority.connect_timeout_secs = 1;
    config.authority.request_timeout_secs = 2;
    config.shutdown.grace_period_secs = 2;
    config
}
