// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Units of captured output on their way to the sink.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::constants::PER_ITEM_OVERHEAD_BYTES;
use crate::splitter::split_chunk;

/// Unprocessed bytes read from the workload, stamped when they were captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub captured_at: SystemTime,
    pub payload: Vec<u8>,
}

impl RawChunk {
    /// Stamps `payload` with the current wall-clock time.
    #[must_use]
    pub fn now(payload: Vec<u8>) -> Self {
        RawChunk {
            captured_at: SystemTime::now(),
            payload,
        }
    }

    /// Milliseconds since the Unix epoch. Clocks set before the epoch map to 0.
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.captured_at
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    /// Decodes and splits the chunk into events whose messages stay within
    /// `max_message_bytes`. Every event shares the chunk's timestamp.
    pub fn events(&self, max_message_bytes: usize) -> impl Iterator<Item = LogEvent> + '_ {
        let timestamp_ms = self.timestamp_ms();
        split_chunk(&self.payload, max_message_bytes)
            .map(move |message| LogEvent::new(timestamp_ms, message))
    }
}

/// A size-bounded, timestamped message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub message: String,
    /// Budget cost of the event: message bytes plus the sink's per-item overhead.
    #[serde(skip)]
    pub cost: usize,
}

impl LogEvent {
    #[must_use]
    pub fn new(timestamp_ms: i64, message: String) -> Self {
        let cost = message.len() + PER_ITEM_OVERHEAD_BYTES;
        LogEvent {
            timestamp_ms,
            message,
            cost,
        }
    }
}
