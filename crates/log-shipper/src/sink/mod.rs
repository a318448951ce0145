// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Destinations for flushed batches.
//!
//! - **[`http`]**: posts batches as JSON to a remote log sink
//! - **[`stdout`]**: prints batches locally when no sink is configured

use async_trait::async_trait;

use crate::error::SinkError;
use crate::event::LogEvent;

pub mod http;
pub mod stdout;

/// Accepts ordered batches of events.
///
/// Callers guarantee every batch is within the sink's count and byte limits
/// and that events appear in the order they were captured.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Makes sure the destination exists. Called once, before the first
    /// [`Sink::submit`].
    async fn provision(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn submit(&self, events: &[LogEvent]) -> Result<(), SinkError>;
}
