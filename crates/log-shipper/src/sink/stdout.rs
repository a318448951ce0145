// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::SinkError;
use crate::event::LogEvent;
use crate::sink::Sink;

/// Writes every event as `<timestamp_ms> <message:?>` on its own line.
pub struct StdoutSink<W = tokio::io::Stdout> {
    writer: Mutex<W>,
}

impl StdoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> StdoutSink<W> {
    pub fn with_writer(writer: W) -> Self {
        StdoutSink {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Sink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn submit(&self, events: &[LogEvent]) -> Result<(), SinkError> {
        let mut out = String::new();
        for event in events {
            out.push_str(&format!("{} {:?}\n", event.timestamp_ms, event.message));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}
