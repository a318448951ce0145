// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use log_shipper::{
    config::ShipperConfig,
    constants::WORKLOAD_STOP_GRACE,
    error::ShipperError,
    logger,
    pipeline::Pipeline,
    shutdown::signals,
    sink::{http::HttpSink, stdout::StdoutSink, Sink},
    workload::CommandWorkload,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet; the level itself may be what failed.
            eprintln!("LOG_SHIPPER | ERROR | {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logger::init(&config.log_level) {
        eprintln!("LOG_SHIPPER | ERROR | Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every worker exited before its join timeout.
async fn run(config: ShipperConfig) -> Result<bool, ShipperError> {
    let sink: Arc<dyn Sink> = match config.http_sink() {
        Some(sink_config) => {
            info!(
                "Shipping to {} ({}/{})",
                sink_config.endpoint, sink_config.log_group, sink_config.log_stream
            );
            Arc::new(HttpSink::new(sink_config).map_err(ShipperError::Sink)?)
        }
        None => {
            warn!("SHIPPER_ENDPOINT not set, printing batches to stdout");
            Arc::new(StdoutSink::new())
        }
    };
    sink.provision().await.map_err(ShipperError::Provisioning)?;

    let mut workload = CommandWorkload::spawn(&config.command).map_err(ShipperError::Workload)?;
    let Some(output) = workload.take_output() else {
        workload.stop(WORKLOAD_STOP_GRACE).await;
        return Err(ShipperError::Workload(std::io::Error::other(
            "workload output is not piped",
        )));
    };

    let pipeline = Pipeline::new(config.budgets(), sink, config.join_timeout);
    let report = pipeline.run(output, signals::termination()).await;

    workload.stop(WORKLOAD_STOP_GRACE).await;
    Ok(report.alive_workers().is_empty())
}
