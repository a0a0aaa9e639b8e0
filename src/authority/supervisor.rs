//! Background retry loop for the authority connection.
//!
//! # Responsibilities
//! - Periodically read the connection state
//! - While not ready: count retries, fire a reconnect trigger, back off
//! - While ready: reset the retry counter and poll at a fixed interval
//!
//! # Design Decisions
//! - The supervisor never changes state itself; it only reads it and
//!   triggers reconnects, the transport reports the outcome
//! - Never gives up and never fails the process
//! - Every sleep races the shutdown signal so teardown can join the task

use std::future::Future;
use std::sync::Arc;

use crate::authority::state::ConnectionState;
use crate::config::SupervisorConfig;
use crate::resilience::linear_backoff;

/// What the supervisor needs from a connection.
pub trait Supervised: Send + Sync + 'static {
    /// Target address, for logs.
    fn target(&self) -> &str;

    /// Currently observed transport state.
    fn state(&self) -> ConnectionState;

    /// Ask the transport to (re)connect without waiting for the outcome.
    fn trigger_reconnect(&self);

    /// Publish the current consecutive-retry count.
    fn record_retries(&self, retries: u32);
}

/// Retry/backoff loop over a [`Supervised`] connection.
pub struct Supervisor<T> {
    target: Arc<T>,
    config: SupervisorConfig,
}

impl<T: Supervised> Supervisor<T> {
    pub fn new(target: Arc<T>, config: SupervisorConfig) -> Self {
        Self { target, config }
    }

    /// Run until the connection is shut down or `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let address = self.target.target().to_string();
        let mut retry_count: u32 = 0;
        let mut was_ready = false;

        tracing::info!(target_address = %address, "Authority supervisor starting");

        loop {
            let state = self.target.state();
            let delay = match state {
                ConnectionState::Shutdown => {
                    tracing::info!(target_address = %address, "Authority connection closed, supervisor exiting");
                    return;
                }
                ConnectionState::Ready => {
                    if !was_ready {
                        tracing::info!(
                            target_address = %address,
                            after_retries = retry_count,
                            "Authority connected"
                        );
                    }
                    was_ready = true;
                    if retry_count != 0 {
                        retry_count = 0;
                        self.target.record_retries(0);
                    }
                    self.config.poll_interval()
                }
                state => {
                    was_ready = false;
                    retry_count = retry_count.saturating_add(1);
                    self.target.record_retries(retry_count);

                    let backoff = linear_backoff(
                        retry_count,
                        self.config.backoff_step(),
                        self.config.backoff_cap(),
                    );
                    tracing::warn!(
                        target_address = %address,
                        state = %state,
                        retry = retry_count,
                        backoff_secs = backoff.as_secs(),
                        "Authority not ready, retrying"
                    );

                    self.target.trigger_reconnect();
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    tracing::info!(target_address = %address, "Authority supervisor received shutdown signal, exiting loop");
                    return;
                }
            }
        }
    }
}
