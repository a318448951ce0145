// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The workload whose output gets shipped.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

/// A shell command run under `sh -c` with stderr folded into stdout.
#[derive(Debug)]
pub struct CommandWorkload {
    child: Child,
}

impl CommandWorkload {
    pub fn spawn(command: &str) -> std::io::Result<Self> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(format!("exec 2>&1\n{command}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        info!("Started workload (pid {:?}): {command}", child.id());
        Ok(CommandWorkload { child })
    }

    /// The combined output stream. Only the first call returns `Some`.
    pub fn take_output(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Kills the workload if it is still running and reaps it, waiting at
    /// most `grace`. Returns `None` when the exit could not be observed.
    pub async fn stop(&mut self, grace: Duration) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Workload already exited: {status}");
                return Some(status);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to poll workload status: {e}"),
        }

        if let Err(e) = self.child.start_kill() {
            warn!("Failed to kill workload: {e}");
        }
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Workload stopped: {status}");
                Some(status)
            }
            Ok(Err(e)) => {
                warn!("Failed to reap workload: {e}");
                None
            }
            Err(_) => {
                warn!("Workload did not exit within {grace:?}");
                None
            }
        }
    }
}
