//! Service registry for the inbound gRPC server.
//!
//! Business services are opaque here: callers register anything tonic can
//! route, plus the encoded file descriptor set reflection should advertise
//! for it. `grpc.health.v1` is always registered.

use std::convert::Infallible;

use http::{Request, Response};
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::service::{Routes, RoutesBuilder};
use tonic_health::server::HealthReporter;
use tower::Service;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),
}

pub struct RpcServices {
    routes: RoutesBuilder,
    descriptor_sets: Vec<&'static [u8]>,
    health: HealthReporter,
    names: Vec<&'static str>,
}

impl RpcServices {
    pub fn new() -> Self {
        let (health, health_service) = tonic_health::server::health_reporter();
        let mut routes = RoutesBuilder::default();
        routes.add_service(health_service);

        Self {
            routes,
            descriptor_sets: vec![tonic_health::pb::FILE_DESCRIPTOR_SET],
            health,
            names: Vec::new(),
        }
    }

    /// Register a service and mark it `SERVING` on the health endpoint.
    pub fn add_service<S>(&mut self, service: S) -> &mut Self
    where
        S: Service<Request<BoxBody>, Response = Response<BoxBody>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        self.names.push(S::NAME);
        self.routes.add_service(service);
        self
    }

    /// Advertise a service's descriptors through reflection.
    pub fn with_file_descriptor_set(&mut self, encoded: &'static [u8]) -> &mut Self {
        self.descriptor_sets.push(encoded);
        self
    }

    /// Finish registration. With `reflection` on, adds server reflection v1
    /// covering every registered descriptor set.
    pub async fn into_routes(self, reflection: bool) -> Result<Routes, RpcError> {
        let Self {
            mut routes,
            descriptor_sets,
            mut health,
            names,
        } = self;

        for name in &names {
            health
                .set_service_status(*name, tonic_health::ServingStatus::Serving)
                .await;
        }

        if reflection {
            let service = descriptor_sets
                .into_iter()
                .chain([tonic_reflection::pb::v1::FILE_DESCRIPTOR_SET])
                .fold(
                    tonic_reflection::server::Builder::configure(),
                    |builder, encoded| builder.register_encoded_file_descriptor_set(encoded),
                )
                .build_v1()?;
            routes.add_service(service);
        }

        tracing::info!(services = ?names, reflection, "gRPC services registered");
        Ok(routes.routes())
    }
}

impl Default for RpcServices {
    fn default() -> Self {
        Self::new()
    }
}
