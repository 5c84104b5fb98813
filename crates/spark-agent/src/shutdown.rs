// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process signals mapped onto a cancellation token for graceful shutdown.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which signal ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSignal::Interrupt => f.write_str("SIGINT"),
            StopSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Returns a token that is cancelled on the first SIGINT or SIGTERM.
///
/// Must be called inside a Tokio runtime.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal = next_stop_signal().await;
        info!(%signal, "draining in-flight requests before exit");
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn next_stop_signal() -> StopSignal {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = tokio::signal::ctrl_c() => StopSignal::Interrupt,
            _ = terminate.recv() => StopSignal::Terminate,
        },
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable; only Ctrl+C stops the server");
            let _ = tokio::signal::ctrl_c().await;
            StopSignal::Interrupt
        }
    }
}

#[cfg(not(unix))]
async fn next_stop_signal() -> StopSignal {
    let _ = tokio::signal::ctrl_c().await;
    StopSignal::Interrupt
}
