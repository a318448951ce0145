// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships the live output of a running workload to a remote log sink.
//!
//! The pipeline has two long-lived tasks joined by an unbounded FIFO:
//!
//! ```text
//!   workload stdout/stderr
//!           │
//!           v
//!    ┌──────────────┐   RawChunk    ┌──────────────┐   Vec<LogEvent>   ┌──────┐
//!    │  Collector   │ ────────────> │   Batcher    │ ────────────────> │ Sink │
//!    └──────────────┘  (transfer)   └──────────────┘                   └──────┘
//! ```
//!
//! The [`batcher`] accumulates events under count, byte and time budgets and
//! only ever submits batches the sink is guaranteed to accept. The
//! [`pipeline`] supervisor owns both tasks and bounds their shutdown with
//! explicit join timeouts.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod logger;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod splitter;
pub mod transfer;
pub mod workload;
