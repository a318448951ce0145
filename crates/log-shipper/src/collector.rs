// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reads the workload's output and hands timestamped chunks to the batcher.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::constants::READ_BUFFER_SIZE;
use crate::event::RawChunk;
use crate::transfer::ChunkSender;

/// Why the collector stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorExit {
    /// The workload closed its output.
    EndOfStream,
    Cancelled,
    /// The batcher dropped its end of the channel.
    ReceiverClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSummary {
    pub chunks: u64,
    pub bytes: u64,
    pub exit: CollectorExit,
}

/// Single writer of the transfer channel.
pub struct Collector<R> {
    reader: R,
    sender: ChunkSender,
    cancel_token: CancellationToken,
}

impl<R> Collector<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, sender: ChunkSender, cancel_token: CancellationToken) -> Self {
        Collector {
            reader,
            sender,
            cancel_token,
        }
    }

    /// Reads until the stream ends or cancellation is observed.
    ///
    /// A pending read is abandoned as soon as the token is cancelled, so a
    /// silent workload does not hold up shutdown. Read errors end the task and
    /// are returned to the supervisor.
    pub async fn run(mut self) -> std::io::Result<CollectorSummary> {
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        let exit = loop {
            let mut buf = vec![0; READ_BUFFER_SIZE];
            let read = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break CollectorExit::Cancelled,
                read = self.reader.read(&mut buf) => read?,
            };

            if read == 0 {
                break CollectorExit::EndOfStream;
            }
            buf.truncate(read);
            trace!("Captured {read} bytes");

            if self.sender.push(RawChunk::now(buf)).is_err() {
                break CollectorExit::ReceiverClosed;
            }
            chunks += 1;
            bytes += read as u64;
        };

        match exit {
            CollectorExit::EndOfStream => info!("Workload output ended after {bytes} bytes"),
            CollectorExit::Cancelled => debug!("Collector cancelled after {bytes} bytes"),
            CollectorExit::ReceiverClosed => debug!("Batcher gone, collector stopping"),
        }

        Ok(CollectorSummary {
            chunks,
            bytes,
            exit,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transfer::{self, Received};
    use std::time::Duration;

    #[tokio::test]
    async fn test_reads_until_end_of_stream() {
        let (tx, mut rx) = transfer::channel();
        let reader: &[u8] = b"first line\nsecond line\n";
        let summary = Collector::new(reader, tx, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.exit, CollectorExit::EndOfStream);
        assert_eq!(summary.bytes, 23);

        let mut captured = Vec::new();
        while let Received::Chunk(chunk) = rx.recv_timeout(Duration::from_millis(10)).await {
            captured.extend(chunk.payload);
        }
        assert_eq!(captured, b"first line\nsecond line\n");
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_pending_read() {
        let (tx, _rx) = transfer::channel();
        // The write half stays open, so reads on the other end never complete.
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel_token = CancellationToken::new();

        let task = tokio::spawn(Collector::new(reader, tx, cancel_token.clone()).run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_token.cancel();

        let summary = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("collector did not observe cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(summary.exit, CollectorExit::Cancelled);
        assert_eq!(summary.chunks, 0);
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = transfer::channel();
        drop(rx);
        let reader: &[u8] = b"nobody is listening";
        let summary = Collector::new(reader, tx, CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.exit, CollectorExit::ReceiverClosed);
    }

    #[tokio::test]
    async fn test_read_error_is_returned() {
        struct Broken;
        impl AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("pipe broke")))
            }
        }

        let (tx, _rx) = transfer::channel();
        let err = Collector::new(Broken, tx, CancellationToken::new())
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "pipe broke");
    }
}
