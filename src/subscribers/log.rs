//! # LogWriter: events to `tracing` records
//!
//! The reporting sink of the process. Every [`Event`] becomes one structured `tracing`
//! record; the level follows the event's meaning:
//!
//! | Level   | Kinds                                                                     |
//! |---------|---------------------------------------------------------------------------|
//! | `error` | `ChannelFailed`, `GraceExceeded`                                          |
//! | `warn`  | `ChannelConflict`, `StreamOpenFailed`, `StreamEnded`, `PublishFailed`, `WatchFailed` |
//! | `info`  | instance, channel, start/stop and shutdown events                         |
//! | `debug` | `ChunkPublished`, `StreamAlreadyActive`                                   |
//!
//! ## Example output (text format)
//! ```text
//! INFO  pod created instance="ns/app-1" app="checkout" phase=Pending
//! INFO  topic created channel="checkout"
//! INFO  started streaming logs instance="ns/app-1" channel="checkout"
//! WARN  log stream ended instance="ns/app-1" label="stream_read" reason="closed by stop"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let instance = e.instance.as_deref().unwrap_or("");
        let app = e.app.as_deref().unwrap_or("");
        let channel = e.channel.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        let label = e.label.unwrap_or("");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("");

        match e.kind {
            EventKind::InstanceAdded => info!(seq = e.seq, instance, app, phase, "pod created"),
            EventKind::InstanceUpdated => info!(seq = e.seq, instance, app, phase, "pod updated"),
            EventKind::InstanceDeleted => info!(seq = e.seq, instance, app, phase, "pod deleted"),
            EventKind::WatchFailed => warn!(seq = e.seq, label, reason, "pod watch error"),

            EventKind::ChannelCreated => info!(seq = e.seq, channel, "topic created"),
            EventKind::ChannelDeleted => info!(seq = e.seq, channel, "topic deleted"),
            EventKind::ChannelConflict => {
                warn!(seq = e.seq, channel, label, reason, "topic administration conflict")
            }
            EventKind::ChannelFailed => {
                error!(seq = e.seq, channel, label, reason, "topic administration failed")
            }

            EventKind::StreamStarted => {
                info!(seq = e.seq, instance, channel, "started streaming logs")
            }
            EventKind::StreamAlreadyActive => {
                debug!(seq = e.seq, instance, "already streaming; ignoring")
            }
            EventKind::StreamOpenFailed => {
                warn!(seq = e.seq, instance, label, reason, "failed to open log stream")
            }
            EventKind::StreamEnded => {
                warn!(seq = e.seq, instance, label, reason, "log stream ended")
            }
            EventKind::StreamStopped => info!(seq = e.seq, instance, app, "stopped streaming logs"),
            EventKind::ChunkPublished => {
                debug!(seq = e.seq, instance, channel, bytes = e.bytes.unwrap_or(0), "sent chunk")
            }
            EventKind::PublishFailed => {
                warn!(seq = e.seq, instance, channel, label, reason, "failed to send chunk")
            }

            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(seq = e.seq, "all streams stopped within grace"),
            EventKind::GraceExceeded => error!(seq = e.seq, reason, "shutdown grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
