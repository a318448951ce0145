// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching of log events under count, byte and time budgets.
//!
//! # Batching Strategy
//!
//! Events are accumulated until one of three budgets is hit:
//! 1. **Count**: `max_batch_count` pending events
//! 2. **Bytes**: `max_batch_bytes` of pending cost
//! 3. **Interval**: `flush_interval` elapsed since the last flush
//!
//! A flush submits the longest prefix of the pending batch that fits both the
//! count and the byte budget, so no request can ever be rejected for size.
//! Whatever does not fit stays pending, in order, for the next flush.
//!
//! # Heartbeat
//!
//! The batcher waits on the transfer channel for at most `flush_interval`.
//! That wait is the only suspension point of the loop and lets the interval
//! budget fire even when the workload is silent. A timeout on an empty batch
//! only resets the clock, so the first event after a quiet period is not
//! flushed immediately on its own.
//!
//! # Delivery
//!
//! Sink failures are logged and the batch is dropped; nothing is retried.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::{self, PER_ITEM_OVERHEAD_BYTES};
use crate::error::ConfigError;
use crate::event::{LogEvent, RawChunk};
use crate::sink::Sink;
use crate::transfer::{ChunkReceiver, Received};

/// Ceilings imposed by the sink on a single submit call, plus the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub max_batch_count: usize,
    pub max_batch_bytes: usize,
    pub flush_interval: Duration,
}

impl Default for Budgets {
    fn default() -> Self {
        Budgets {
            max_batch_count: constants::MAX_BATCH_COUNT,
            max_batch_bytes: constants::MAX_BATCH_BYTES,
            flush_interval: constants::FLUSH_INTERVAL,
        }
    }
}

impl Budgets {
    /// Checks that every event can carry at least one character and that a
    /// flush always makes progress.
    pub fn new(
        max_batch_count: usize,
        max_batch_bytes: usize,
        flush_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if max_batch_count == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SHIPPER_MAX_BATCH_COUNT",
                reason: "must be at least 1".to_string(),
            });
        }

        let min_bytes = PER_ITEM_OVERHEAD_BYTES + constants::MAX_CHAR_BYTES;
        if max_batch_bytes < min_bytes {
            return Err(ConfigError::InvalidValue {
                name: "SHIPPER_MAX_BATCH_BYTES",
                reason: format!("must be at least {min_bytes}"),
            });
        }

        if flush_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "SHIPPER_FLUSH_INTERVAL_SECS",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Budgets {
            max_batch_count,
            max_batch_bytes,
            flush_interval,
        })
    }

    /// Largest message a single event may carry so that its cost alone fits
    /// the byte budget.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_batch_bytes.saturating_sub(PER_ITEM_OVERHEAD_BYTES)
    }
}

/// Which budget triggered a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Count,
    Bytes,
    Interval,
    /// Final drain after the batcher was told to stop.
    Shutdown,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushReason::Count => write!(f, "count"),
            FlushReason::Bytes => write!(f, "bytes"),
            FlushReason::Interval => write!(f, "interval"),
            FlushReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Events waiting to be flushed, their total cost and the flush clock.
#[derive(Debug)]
pub struct PendingBatch {
    budgets: Budgets,
    events: VecDeque<LogEvent>,
    cost: usize,
    last_flush: Instant,
}

impl PendingBatch {
    #[must_use]
    pub fn new(budgets: Budgets, now: Instant) -> Self {
        PendingBatch {
            budgets,
            events: VecDeque::new(),
            cost: 0,
            last_flush: now,
        }
    }

    pub fn push(&mut self, event: LogEvent) {
        self.cost += event.cost;
        self.events.push_back(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn cost(&self) -> usize {
        self.cost
    }

    pub fn reset_clock(&mut self, now: Instant) {
        self.last_flush = now;
    }

    /// Returns the budget that requires a flush at `now`, if any.
    ///
    /// An empty batch never needs flushing.
    #[must_use]
    pub fn flush_reason(&self, now: Instant) -> Option<FlushReason> {
        if self.events.is_empty() {
            return None;
        }
        if self.events.len() >= self.budgets.max_batch_count {
            Some(FlushReason::Count)
        } else if self.cost >= self.budgets.max_batch_bytes {
            Some(FlushReason::Bytes)
        } else if now.saturating_duration_since(self.last_flush) >= self.budgets.flush_interval {
            Some(FlushReason::Interval)
        } else {
            None
        }
    }

    /// Length of the longest prefix within both the count and byte budgets.
    ///
    /// Never zero for a non-empty batch: the first event is always admitted,
    /// even under a zero count budget.
    #[must_use]
    pub fn drainable_len(&self) -> usize {
        let mut total = 0usize;
        let mut len = 0usize;
        for event in self.events.iter().take(self.budgets.max_batch_count.max(1)) {
            if len > 0 && total + event.cost > self.budgets.max_batch_bytes {
                break;
            }
            total += event.cost;
            len += 1;
        }
        len
    }

    /// Removes the drainable prefix and returns it in order. The clock is
    /// restarted at `now`.
    pub fn drain_prefix(&mut self, now: Instant) -> Vec<LogEvent> {
        let len = self.drainable_len();
        let batch: Vec<LogEvent> = self.events.drain(..len).collect();
        self.cost = self.events.iter().map(|e| e.cost).sum();
        self.last_flush = now;
        batch
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherSummary {
    pub flushes: u64,
    pub failed_flushes: u64,
    pub events_sent: u64,
    pub events_dropped: u64,
    pub bytes_sent: u64,
}

/// Pulls chunks from the transfer channel and flushes batches to the sink.
pub struct Batcher {
    pending: PendingBatch,
    receiver: ChunkReceiver,
    sink: Arc<dyn Sink>,
    cancel_token: CancellationToken,
    summary: BatcherSummary,
}

impl Batcher {
    pub fn new(
        budgets: Budgets,
        receiver: ChunkReceiver,
        sink: Arc<dyn Sink>,
        cancel_token: CancellationToken,
    ) -> Self {
        Batcher {
            pending: PendingBatch::new(budgets, Instant::now()),
            receiver,
            sink,
            cancel_token,
            summary: BatcherSummary::default(),
        }
    }

    /// Runs until cancelled or until the collector is gone, then drains what
    /// is left. The final drain is best effort: it only completes if the
    /// supervisor gives the task enough time before giving up on it.
    pub async fn run(mut self) -> BatcherSummary {
        let flush_interval = self.pending.budgets.flush_interval;

        loop {
            let received = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break,
                received = self.receiver.recv_timeout(flush_interval) => received,
            };

            match received {
                Received::Chunk(chunk) => self.accept(&chunk),
                Received::Timeout => {
                    if self.pending.is_empty() {
                        self.pending.reset_clock(Instant::now());
                    }
                }
                Received::Closed => {
                    debug!("Transfer channel closed");
                    break;
                }
            }

            self.flush_while_due().await;
        }

        self.drain().await;
        info!(
            "Batcher stopped: {} flushes ({} failed), {} events sent, {} dropped",
            self.summary.flushes,
            self.summary.failed_flushes,
            self.summary.events_sent,
            self.summary.events_dropped
        );
        self.summary
    }

    fn accept(&mut self, chunk: &RawChunk) {
        for event in chunk.events(self.pending.budgets.max_message_bytes()) {
            self.pending.push(event);
        }
    }

    /// Flushes until no budget is exceeded. A chunk can add many events at
    /// once, so one prefix may not be enough to get back under budget.
    async fn flush_while_due(&mut self) {
        while let Some(reason) = self.pending.flush_reason(Instant::now()) {
            self.flush(reason).await;
        }
    }

    async fn flush(&mut self, reason: FlushReason) {
        let batch = self.pending.drain_prefix(Instant::now());
        let count = batch.len() as u64;
        let bytes: usize = batch.iter().map(|e| e.cost).sum();

        self.summary.flushes += 1;
        match self.sink.submit(&batch).await {
            Ok(()) => {
                info!(
                    "Flushed {count} events ({bytes} bytes, trigger: {reason}), {} pending",
                    self.pending.len()
                );
                self.summary.events_sent += count;
                self.summary.bytes_sent += bytes as u64;
            }
            Err(e) => {
                error!("Failed to flush {count} events ({bytes} bytes, trigger: {reason}): {e}");
                self.summary.failed_flushes += 1;
                self.summary.events_dropped += count;
            }
        }
    }

    /// Flushes everything pending and keeps receiving until the collector
    /// has dropped its sender, so a chunk read while shutdown was requested
    /// still ships. The collector stops promptly once cancelled and the
    /// supervisor bounds this wait with its join timeout.
    async fn drain(&mut self) {
        let mut announced = false;
        loop {
            while let Some(chunk) = self.receiver.try_recv() {
                self.accept(&chunk);
            }
            if !self.pending.is_empty() {
                if !announced && self.cancel_token.is_cancelled() {
                    warn!(
                        "Draining {} pending events before shutdown",
                        self.pending.len()
                    );
                    announced = true;
                }
                while !self.pending.is_empty() {
                    self.flush(FlushReason::Shutdown).await;
                }
            }

            match self.receiver.recv().await {
                Some(chunk) => self.accept(&chunk),
                None => break,
            }
        }
    }
}
