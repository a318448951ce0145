// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! FIFO hand-off between the collector and the batcher.
//!
//! The channel is unbounded so that a slow sink can never stall the read side
//! of the workload's pipe. Memory is bounded in practice by the batcher
//! draining at sink speed; there is no eviction.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::RawChunk;

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChunkSender { tx }, ChunkReceiver { rx })
}

/// Returned by [`ChunkSender::push`] once the receiver has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transfer channel closed")]
pub struct ChannelClosed;

/// Write half, owned by the collector.
#[derive(Debug)]
pub struct ChunkSender {
    tx: mpsc::UnboundedSender<RawChunk>,
}

impl ChunkSender {
    /// Enqueues `chunk` without blocking.
    pub fn push(&self, chunk: RawChunk) -> Result<(), ChannelClosed> {
        self.tx.send(chunk).map_err(|_| ChannelClosed)
    }
}

/// Outcome of a bounded wait on the channel.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    Chunk(RawChunk),
    /// Nothing arrived within the wait.
    Timeout,
    /// The sender is gone and every queued chunk has been received.
    Closed,
}

/// Read half, owned by the batcher.
#[derive(Debug)]
pub struct ChunkReceiver {
    rx: mpsc::UnboundedReceiver<RawChunk>,
}

impl ChunkReceiver {
    /// Waits up to `wait` for the next chunk.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Received {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(chunk)) => Received::Chunk(chunk),
            Ok(None) => Received::Closed,
            Err(_) => Received::Timeout,
        }
    }

    /// Waits for the next chunk with no bound. `None` once the sender is gone
    /// and the queue is empty.
    pub async fn recv(&mut self) -> Option<RawChunk> {
        self.rx.recv().await
    }

    /// Takes the next queued chunk if one is immediately available.
    pub fn try_recv(&mut self) -> Option<RawChunk> {
        self.rx.try_recv().ok()
    }
}
