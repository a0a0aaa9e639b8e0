//! Metrics collection and exposition.
//!
//! # Metrics
//! - `auth_gate_requests_total` (counter): gate decisions by outcome
//! - `authority_connection_state` (gauge): 0 idle, 1 connecting, 2 ready,
//!   3 transient failure, 4 shutdown
//! - `authority_reconnect_attempts_total` (counter): reconnect triggers fired
//! - `rpc_calls_total` (counter): inbound gRPC calls by method and code
//! - `rpc_call_duration_seconds` (histogram): inbound gRPC latency
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tonic::Code;

use crate::authority::ConnectionState;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("auth_gate_requests_total", "Auth gate decisions by outcome");
    describe_gauge!("authority_connection_state", "Authority channel state");
    describe_counter!(
        "authority_reconnect_attempts_total",
        "Reconnect triggers fired by the supervisor"
    );
    describe_counter!("rpc_calls_total", "Inbound gRPC calls by method and status code");
    describe_histogram!("rpc_call_duration_seconds", "Inbound gRPC call latency");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_auth_outcome(outcome: &'static str) {
    counter!("auth_gate_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_state(state: ConnectionState) {
    gauge!("authority_connection_state").set(state.as_gauge());
}

pub fn record_reconnect_attempt() {
    counter!("authority_reconnect_attempts_total").increment(1);
}

pub fn record_rpc_call(method: &str, code: Code, elapsed: Duration) {
    counter!("rpc_calls_total", "method" => method.to_string(), "code" => format!("{code:?}"))
        .increment(1);
    histogram!("rpc_call_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}
