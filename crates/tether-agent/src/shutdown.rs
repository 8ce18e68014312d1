// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the agent loop monitors. Worker tasks are
//! drained before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tether_core::UserId;

use crate::Worker;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Drains worker tasks: drops their inboxes so they stop after the turn in
/// flight, then waits up to `grace` for all of them to finish.
pub(crate) async fn drain_workers(workers: Vec<(UserId, Worker)>, grace: Duration) {
    if workers.is_empty() {
        info!("no workers to drain");
        return;
    }

    let count = workers.len();
    info!(count, "waiting for workers to finish");

    let mut handles = Vec::with_capacity(count);
    for (_, Worker { tx, handle }) in workers {
        drop(tx);
        handles.push(handle);
    }

    let joined = tokio::time::timeout(grace, futures::future::join_all(handles)).await;
    match joined {
        Ok(_) => info!("all workers drained"),
        Err(_) => warn!("grace period elapsed, some workers interrupted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        // Cancel it manually to clean up the background task.
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_workers() {
        // Completes immediately with no workers.
        drain_workers(Vec::new(), Duration::from_millis(10)).await;
    }
}
