// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cooperative shutdown of the pipeline workers.
//!
//! Workers hold a [`CancellationToken`] and check it at their suspension
//! points. Nothing can force a worker to stop, so the supervisor bounds every
//! join with a timeout and reports what is still running instead of hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared, set-once shutdown request.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to hand to a worker at construction.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown. Only the first call has an effect and is logged;
    /// it returns `true`.
    pub fn request(&self, reason: &str) -> bool {
        if self
            .requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("Shutdown requested: {reason}");
        self.token.cancel();
        true
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// How a worker ended up once the supervisor stopped waiting for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus<T> {
    Exited(T),
    /// The task panicked or returned an error.
    Failed(String),
    /// Still running when the join timeout elapsed. The task is left detached.
    StillRunning,
}

impl<T> WorkerStatus<T> {
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(self, WorkerStatus::StillRunning)
    }
}

/// Waits for `handle` for at most `timeout`.
pub async fn join_with_timeout<T>(
    name: &str,
    handle: JoinHandle<T>,
    timeout: Duration,
) -> WorkerStatus<T> {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(value)) => WorkerStatus::Exited(value),
        Ok(Err(e)) => {
            warn!("{name} task failed: {e}");
            WorkerStatus::Failed(e.to_string())
        }
        Err(_) => {
            warn!("{name} did not exit within {timeout:?}, leaving it running");
            WorkerStatus::StillRunning
        }
    }
}

/// Host signals that request shutdown.
pub mod signals {
    use tracing::error;

    /// Resolves on Ctrl-C or, on unix, SIGTERM. Both mean the same thing.
    pub async fn termination() -> &'static str {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => "interrupt",
                        _ = sigterm.recv() => "terminate",
                    }
                }
                Err(e) => {
                    error!("Unable to listen for SIGTERM: {e}");
                    ctrl_c().await
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c().await
        }
    }

    async fn ctrl_c() -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "interrupt",
            Err(e) => {
                error!("Unable to listen for Ctrl-C: {e}");
                std::future::pending().await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_request_is_set_once() {
        let coordinator = ShutdownCoordinator::new();
        let clone = coordinator.clone();
        assert!(!clone.is_requested());

        assert!(coordinator.request("interrupt"));
        assert!(!clone.request("terminate"));
        assert!(clone.is_requested());
        assert!(coordinator.token().is_cancelled());

        assert!(logs_contain("Shutdown requested: interrupt"));
        assert!(!logs_contain("Shutdown requested: terminate"));
    }

    #[tokio::test]
    async fn test_join_reports_exited_worker() {
        let handle = tokio::spawn(async { 7 });
        let status = join_with_timeout("worker", handle, Duration::from_secs(1)).await;
        assert_eq!(status, WorkerStatus::Exited(7));
        assert!(!status.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_gives_up_on_stuck_worker() {
        let handle = tokio::spawn(std::future::pending::<()>());
        let status = join_with_timeout("worker", handle, Duration::from_secs(5)).await;
        assert_eq!(status, WorkerStatus::StillRunning);
        assert!(status.is_alive());
    }

    #[tokio::test]
    async fn test_join_reports_panicked_worker() {
        let handle = tokio::spawn(async { panic!("boom") });
        let status: WorkerStatus<()> =
            join_with_timeout("worker", handle, Duration::from_secs(1)).await;
        assert!(matches!(status, WorkerStatus::Failed(_)));
    }
}
