//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers
//! - Present them as one stream of [`Termination`] events
//!
//! # Design Decisions
//! - A stream, not a one-shot future: the host keeps listening during the
//!   drain so repeated signals are observed and counted
//! - Handlers are registered eagerly so a signal arriving during startup is
//!   not lost

use std::fmt;
use std::io;
use std::pin::Pin;

use tokio_stream::Stream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupt,
    Terminate,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Interrupt => f.write_str("SIGINT"),
            Termination::Terminate => f.write_str("SIGTERM"),
        }
    }
}

pub type TerminationSignals = Pin<Box<dyn Stream<Item = Termination> + Send>>;

#[cfg(unix)]
pub fn termination_signals() -> io::Result<TerminationSignals> {
    use tokio::signal::unix::{signal, SignalKind};
    use tokio_stream::wrappers::SignalStream;
    use tokio_stream::StreamExt;

    let interrupt =
        SignalStream::new(signal(SignalKind::interrupt())?).map(|()| Termination::Interrupt);
    let terminate =
        SignalStream::new(signal(SignalKind::terminate())?).map(|()| Termination::Terminate);

    Ok(Box::pin(interrupt.merge(terminate)))
}

#[cfg(not(unix))]
pub fn termination_signals() -> io::Result<TerminationSignals> {
    let stream = futures_util::stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some((Termination::Interrupt, ())),
            Err(e) => {
                tracing::error!(error = %e, "Ctrl+C handler failed");
                None
            }
        }
    });
    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_signal_names() {
        assert_eq!(Termination::Interrupt.to_string(), "SIGINT");
        assert_eq!(Termination::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn handlers_register() {
        assert!(termination_signals().is_ok());
    }
}
