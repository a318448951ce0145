// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Supervisor that owns the collector and batcher tasks.
//!
//! `run` spawns both workers, waits until the caller's shutdown future
//! resolves or either worker stops on its own, then cancels both and joins
//! each within `join_timeout`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::{error, info, warn};

use crate::batcher::{Batcher, BatcherSummary, Budgets};
use crate::collector::{Collector, CollectorExit, CollectorSummary};
use crate::shutdown::{join_with_timeout, ShutdownCoordinator, WorkerStatus};
use crate::sink::Sink;
use crate::transfer;

/// Final state of both workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub collector: WorkerStatus<CollectorSummary>,
    pub batcher: WorkerStatus<BatcherSummary>,
}

impl ShutdownReport {
    /// Names of workers still running after their join timeout.
    #[must_use]
    pub fn alive_workers(&self) -> Vec<&'static str> {
        let mut alive = Vec::new();
        if self.collector.is_alive() {
            alive.push("collector");
        }
        if self.batcher.is_alive() {
            alive.push("batcher");
        }
        alive
    }
}

pub struct Pipeline {
    budgets: Budgets,
    sink: Arc<dyn Sink>,
    join_timeout: Duration,
    coordinator: ShutdownCoordinator,
}

impl Pipeline {
    /// The sink must already be provisioned.
    pub fn new(budgets: Budgets, sink: Arc<dyn Sink>, join_timeout: Duration) -> Self {
        Pipeline {
            budgets,
            sink,
            join_timeout,
            coordinator: ShutdownCoordinator::new(),
        }
    }

    /// Coordinator that can stop this pipeline from elsewhere.
    #[must_use]
    pub fn coordinator(&self) -> ShutdownCoordinator {
        self.coordinator.clone()
    }

    /// Ships `output` until `shutdown` resolves or the output ends.
    pub async fn run<R, F>(self, output: R, shutdown: F) -> ShutdownReport
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: Future<Output = &'static str>,
    {
        let (sender, receiver) = transfer::channel();
        let collector = Collector::new(output, sender, self.coordinator.token());
        let batcher = Batcher::new(
            self.budgets,
            receiver,
            Arc::clone(&self.sink),
            self.coordinator.token(),
        );

        info!(
            "Starting pipeline: max {} events / {} bytes per batch, flush every {:?}",
            self.budgets.max_batch_count, self.budgets.max_batch_bytes, self.budgets.flush_interval
        );
        let mut collector_task = tokio::spawn(collector.run());
        let mut batcher_task = tokio::spawn(batcher.run());

        let mut collector_status = None;
        let mut batcher_status = None;
        tokio::select! {
            reason = shutdown => {
                self.coordinator.request(reason);
            }
            joined = &mut collector_task => {
                let status = match joined {
                    Ok(Ok(summary)) => {
                        let reason = match summary.exit {
                            CollectorExit::EndOfStream => "workload output ended",
                            CollectorExit::ReceiverClosed => "batcher stopped",
                            CollectorExit::Cancelled => "collector cancelled",
                        };
                        self.coordinator.request(reason);
                        WorkerStatus::Exited(summary)
                    }
                    Ok(Err(e)) => {
                        error!("Failed to read workload output: {e}");
                        self.coordinator.request("workload output failed");
                        WorkerStatus::Failed(e.to_string())
                    }
                    Err(e) => {
                        error!("Collector task failed: {e}");
                        self.coordinator.request("collector failed");
                        WorkerStatus::Failed(e.to_string())
                    }
                };
                collector_status = Some(status);
            }
            joined = &mut batcher_task => {
                let status = match joined {
                    Ok(summary) => {
                        self.coordinator.request("batcher stopped");
                        WorkerStatus::Exited(summary)
                    }
                    Err(e) => {
                        error!("Batcher task failed: {e}");
                        self.coordinator.request("batcher failed");
                        WorkerStatus::Failed(e.to_string())
                    }
                };
                batcher_status = Some(status);
            }
        }

        let collector = match collector_status {
            Some(status) => status,
            None => match join_with_timeout("collector", collector_task, self.join_timeout).await {
                WorkerStatus::Exited(Ok(summary)) => WorkerStatus::Exited(summary),
                WorkerStatus::Exited(Err(e)) => {
                    error!("Failed to read workload output: {e}");
                    WorkerStatus::Failed(e.to_string())
                }
                WorkerStatus::Failed(e) => WorkerStatus::Failed(e),
                WorkerStatus::StillRunning => WorkerStatus::StillRunning,
            },
        };
        let batcher = match batcher_status {
            Some(status) => status,
            None => join_with_timeout("batcher", batcher_task, self.join_timeout).await,
        };

        let report = ShutdownReport { collector, batcher };
        let alive = report.alive_workers();
        if alive.is_empty() {
            info!("Shutdown complete: collector and batcher exited");
        } else {
            warn!("Shutdown complete with workers still running: {alive:?}");
        }
        report
    }
}
