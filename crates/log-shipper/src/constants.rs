// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink limits and pipeline defaults.
//!
//! The sink rejects any request carrying more than [`MAX_BATCH_COUNT`] events
//! or more than [`MAX_BATCH_BYTES`] of cumulative event cost, where the cost of
//! one event is its UTF-8 message length plus [`PER_ITEM_OVERHEAD_BYTES`].

use std::time::Duration;

/// Maximum number of events accepted in one submit call.
pub const MAX_BATCH_COUNT: usize = 10_000;

/// Maximum cumulative event cost accepted in one submit call.
///
/// # Value: 1MB (1,048,576 bytes)
pub const MAX_BATCH_BYTES: usize = 1_024 * 1_024;

/// Fixed cost the sink charges for every event on top of its message bytes.
pub const PER_ITEM_OVERHEAD_BYTES: usize = 26;

/// Widest UTF-8 encoding of a single character.
pub const MAX_CHAR_BYTES: usize = 4;

/// Longest a batch may sit unsent, and the batcher's heartbeat.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound on how long the supervisor waits for each worker on shutdown.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout of a single request to the sink.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period given to the workload between kill and reap.
pub const WORKLOAD_STOP_GRACE: Duration = Duration::from_secs(1);

/// Size of the buffer the collector reads into. Reads may return less.
pub const READ_BUFFER_SIZE: usize = 8192;

pub const DEFAULT_LOG_GROUP: &str = "log-shipper";
pub const DEFAULT_LOG_STREAM: &str = "default";
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;
