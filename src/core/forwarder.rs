//! # Forwarder: one log stream into one topic.
//!
//! Reads the instance's log in chunks and hands each chunk to the [`Publisher`], paced by
//! a fixed interval between reads.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► read up to chunk_size bytes   (cancellable)
//!   │     ├─► Ok(0)  → end of stream  → exit
//!   │     ├─► Err(e) → read failed    → exit
//!   │     └─► Ok(n)  → publish(app, app, buf[..n])
//!   │                    ├─► Ok  → ChunkPublished
//!   │                    └─► Err → PublishFailed (keep going)
//!   └─► sleep(pace)                   (cancellable)
//! }
//! drop(stream) → StreamEnded
//! ```
//!
//! ## Rules
//! - The task never restarts itself; a new stream needs a new Running update after deletion.
//! - Stop is observed both while a read is blocked and while pacing.
//! - The stream is closed (dropped) before `StreamEnded` is published.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::clients::{LogStream, Publisher};
use crate::error::Error;
use crate::events::{Bus, Event, EventKind};
use crate::model::{ApplicationIdentity, InstanceIdentity};

/// Per-stream settings, taken from [`Config`](crate::Config).
#[derive(Debug, Clone, Copy)]
pub struct ForwarderParams {
    /// Read buffer capacity (one chunk).
    pub chunk_size: usize,
    /// Wait between two reads.
    pub pace: Duration,
}

/// Why a forwarding task finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    EndOfStream,
    ReadFailed(String),
    Stopped,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::EndOfStream => f.write_str("end of stream"),
            ExitReason::ReadFailed(reason) => write!(f, "read failed: {reason}"),
            ExitReason::Stopped => f.write_str("closed by stop"),
        }
    }
}

pub struct Forwarder {
    instance: InstanceIdentity,
    app: ApplicationIdentity,
    stream: LogStream,
    publisher: Arc<dyn Publisher>,
    bus: Bus,
    params: ForwarderParams,
}

impl Forwarder {
    pub fn new(
        instance: InstanceIdentity,
        app: ApplicationIdentity,
        stream: LogStream,
        publisher: Arc<dyn Publisher>,
        bus: Bus,
        params: ForwarderParams,
    ) -> Self {
        Self {
            instance,
            app,
            stream,
            publisher,
            bus,
            params,
        }
    }

    /// Runs until end of stream, a read error, or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> ExitReason {
        let Forwarder {
            instance,
            app,
            mut stream,
            publisher,
            bus,
            params,
        } = self;
        let mut buf = vec![0u8; params.chunk_size.max(1)];

        let reason = loop {
            let read = select! {
                biased;
                _ = token.cancelled() => break ExitReason::Stopped,
                res = stream.read(&mut buf) => res,
            };

            match read {
                Ok(0) => break ExitReason::EndOfStream,
                Ok(n) => forward(&instance, &app, &buf[..n], publisher.as_ref(), &bus),
                Err(e) => break ExitReason::ReadFailed(e.to_string()),
            }

            select! {
                biased;
                _ = token.cancelled() => break ExitReason::Stopped,
                _ = time::sleep(params.pace) => {}
            }
        };
        drop(stream);

        let err = Error::StreamRead {
            instance,
            reason: reason.to_string(),
        };
        bus.publish(Event::from_error(EventKind::StreamEnded, &err).with_app(app.as_str()));
        reason
    }
}

fn forward(
    instance: &InstanceIdentity,
    app: &ApplicationIdentity,
    chunk: &[u8],
    publisher: &dyn Publisher,
    bus: &Bus,
) {
    let channel = app.as_str();
    match publisher.publish(channel, channel, chunk) {
        Ok(()) => bus.publish(
            Event::new(EventKind::ChunkPublished)
                .with_instance(instance.to_string())
                .with_channel(channel)
                .with_bytes(chunk.len()),
        ),
        Err(e) => bus.publish(
            Event::from_error(EventKind::PublishFailed, &e).with_instance(instance.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LogSource;
    use crate::testkit::{MockSource, RecordingPublisher};

    fn params() -> ForwarderParams {
        ForwarderParams {
            chunk_size: 1024,
            pace: Duration::from_secs(1),
        }
    }

    async fn start(
        source: &MockSource,
        publisher: Arc<RecordingPublisher>,
        bus: &Bus,
        params: ForwarderParams,
    ) -> (
        InstanceIdentity,
        CancellationToken,
        tokio::task::JoinHandle<ExitReason>,
    ) {
        let id = InstanceIdentity::new("ns", "app-1");
        let stream = source.open(&id).await.unwrap();
        let fwd = Forwarder::new(
            id.clone(),
            ApplicationIdentity::new("checkout"),
            stream,
            publisher,
            bus.clone(),
            params,
        );
        let token = CancellationToken::new();
        let join = tokio::spawn(fwd.run(token.clone()));
        (id, token, join)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_exactly_the_bytes_read() {
        let source = MockSource::default();
        let publisher = Arc::new(RecordingPublisher::default());
        let bus = Bus::new(64);
        let (id, _token, join) = start(&source, publisher.clone(), &bus, params()).await;

        source.write(&id, b"0123456789").await;
        source.end(&id);

        assert_eq!(join.await.unwrap(), ExitReason::EndOfStream);
        let records = publisher.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel, "checkout");
        assert_eq!(records[0].key, "checkout");
        assert_eq!(records[0].payload, b"0123456789");
        assert_eq!(source.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_are_bounded_and_paced() {
        let source = MockSource::default();
        let publisher = Arc::new(RecordingPublisher::default());
        let bus = Bus::new(64);
        let small = ForwarderParams {
            chunk_size: 4,
            pace: Duration::from_secs(1),
        };
        let (id, _token, join) = start(&source, publisher.clone(), &bus, small).await;

        source.write(&id, b"abcdefghij").await;
        source.end(&id);
        assert_eq!(join.await.unwrap(), ExitReason::EndOfStream);

        let records = publisher.records();
        let payloads: Vec<&[u8]> = records.iter().map(|r| r.payload.as_slice()).collect();
        assert_eq!(payloads, vec![&b"abcd"[..], &b"efgh"[..], &b"ij"[..]]);
        for pair in records.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_a_blocked_read() {
        let source = MockSource::default();
        let publisher = Arc::new(RecordingPublisher::default());
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (_id, token, join) = start(&source, publisher.clone(), &bus, params()).await;

        token.cancel();
        assert_eq!(join.await.unwrap(), ExitReason::Stopped);
        assert_eq!(source.closed(), 1);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::StreamEnded);
        assert_eq!(ev.label, Some("stream_read"));
        assert_eq!(ev.reason.as_deref(), Some("closed by stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_does_not_end_the_stream() {
        let source = MockSource::default();
        let publisher = Arc::new(RecordingPublisher::default());
        publisher.set_failing(true);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, token, join) = start(&source, publisher.clone(), &bus, params()).await;

        source.write(&id, b"lost").await;
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::PublishFailed);
        assert_eq!(ev.channel.as_deref(), Some("checkout"));

        publisher.set_failing(false);
        source.write(&id, b"kept").await;
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ChunkPublished);
        assert_eq!(ev.bytes, Some(4));

        token.cancel();
        assert_eq!(join.await.unwrap(), ExitReason::Stopped);
        assert_eq!(publisher.records().len(), 1);
    }
}
