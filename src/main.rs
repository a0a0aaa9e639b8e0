//! auth-relay
//!
//! Runs the HTTP and gRPC listeners, guards HTTP routes by delegating
//! bearer credentials to the Authentication Authority, and keeps the
//! authority channel alive in the background.
//!
//! ```text
//!   auth-relay --config relay.toml
//!   auth-relay --config relay.toml --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use clap::Parser;

use auth_relay::authority::{Authenticator, AuthorityConnection};
use auth_relay::config::{load_config, ConfigError, RelayConfig};
use auth_relay::http::{self, AuthGate};
use auth_relay::lifecycle::{termination_signals, Host, Shutdown};
use auth_relay::net::filter;
use auth_relay::observability::{logging, metrics};
use auth_relay::rpc::RpcServices;

#[derive(Debug, Parser)]
#[command(name = "auth-relay", version, about = "HTTP + gRPC relay with delegated authentication")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "AUTH_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            report_config_error(&err);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "auth-relay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auth-relay starting");
    tracing::info!(
        http = %config.http.bind_address,
        grpc = %config.rpc.bind_address,
        authority = %config.authority.address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let shutdown = Shutdown::new();

    let authority =
        AuthorityConnection::connect(&config.authority, &config.supervisor, shutdown.notified())?;

    let gate = AuthGate::new(
        Arc::clone(&authority) as Arc<dyn Authenticator>,
        config.authority.request_timeout(),
    );
    let app = http::router(&config.http, gate, Arc::clone(&authority), Router::new());
    let admission = filter::from_config(&config.rpc)?;
    let signals = termination_signals()?;

    let host = Host::bind(&config, app, RpcServices::new(), admission, shutdown.clone()).await;
    let result: Result<_, Box<dyn std::error::Error>> = match host {
        Ok(host) => host.run(signals).await.map_err(Into::into),
        Err(e) => {
            shutdown.trigger();
            Err(e.into())
        }
    };

    authority.close();
    authority.join_supervisor().await;

    let report = result?;
    tracing::info!(
        signal = ?report.signal,
        duplicate_signals = report.duplicate_signals,
        timed_out = report.timed_out,
        "Shutdown complete"
    );
    Ok(())
}

fn report_config_error(err: &ConfigError) {
    eprintln!("configuration error: {err}");
    if let ConfigError::Validation(errors) = err {
        for e in errors {
            eprintln!("  - {e}");
        }
    }
}
