//! # Runtime events emitted by the coordinator and forwarding tasks.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Instance events**: what the watcher reported (added, updated, deleted)
//! - **Channel events**: outcome of topic administration
//! - **Stream events**: forwarding task lifecycle and publishing
//! - **Runtime events**: shutdown progress
//!
//! The [`Event`] struct carries optional metadata (instance, application, channel, phase,
//! byte count, reason) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use logvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StreamEnded)
//!     .with_instance("ns/app-1")
//!     .with_reason("end of stream");
//!
//! assert_eq!(ev.kind, EventKind::StreamEnded);
//! assert_eq!(ev.instance.as_deref(), Some("ns/app-1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::Error;
use crate::model::{Instance, Phase};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or watch stream ended).
    ShutdownRequested,

    /// All forwarding tasks stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some forwarding tasks did not stop in time.
    ///
    /// Sets: `reason` (stuck instances)
    GraceExceeded,

    // === Instance events ===
    /// Watcher reported a new instance.
    ///
    /// Sets: `instance`, `app`, `phase`
    InstanceAdded,

    /// Watcher reported a change of an instance.
    ///
    /// Sets: `instance`, `app`, `phase` (new phase)
    InstanceUpdated,

    /// Watcher reported a removed instance.
    ///
    /// Sets: `instance`, `app`, `phase`
    InstanceDeleted,

    /// The watch stream reported an error; watching continues.
    ///
    /// Sets: `reason`, `label`
    WatchFailed,

    // === Channel events ===
    /// Topic created.
    ///
    /// Sets: `channel`
    ChannelCreated,

    /// Topic deleted.
    ///
    /// Sets: `channel`
    ChannelDeleted,

    /// Topic already existed (create) or was missing (delete). Not a failure.
    ///
    /// Sets: `channel`, `reason`, `label`
    ChannelConflict,

    /// Topic administration failed.
    ///
    /// Sets: `channel`, `reason`, `label`
    ChannelFailed,

    // === Stream events ===
    /// Forwarding task registered and scheduled.
    ///
    /// Sets: `instance`, `app`, `channel`
    StreamStarted,

    /// Instance reported running again while already streaming; nothing done.
    ///
    /// Sets: `instance`
    StreamAlreadyActive,

    /// Log stream could not be opened; instance stays without a stream.
    ///
    /// Sets: `instance`, `reason`, `label`
    StreamOpenFailed,

    /// Forwarding task terminated (end of stream, read error or stop).
    ///
    /// Sets: `instance`, `reason`, `label`
    StreamEnded,

    /// Stream stopped and unregistered after the instance was deleted.
    ///
    /// Sets: `instance`, `app`
    StreamStopped,

    /// One chunk handed to the publisher.
    ///
    /// Sets: `instance`, `channel`, `bytes`
    ChunkPublished,

    /// A chunk could not be enqueued; the task keeps reading.
    ///
    /// Sets: `instance`, `channel`, `reason`, `label`
    PublishFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Instance identity (`namespace/name`), if applicable.
    pub instance: Option<Arc<str>>,
    /// Application identity of the instance.
    pub app: Option<Arc<str>>,
    /// Topic name.
    pub channel: Option<Arc<str>>,
    /// Observed phase of the instance.
    pub phase: Option<Phase>,
    /// Payload size of a published chunk.
    pub bytes: Option<usize>,
    /// Human-readable reason (error message, stuck streams, etc.).
    pub reason: Option<Arc<str>>,
    /// Stable error label, see [`Error::as_label`].
    pub label: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            instance: None,
            app: None,
            channel: None,
            phase: None,
            bytes: None,
            reason: None,
            label: None,
        }
    }

    /// Creates an event describing `err`, filling instance/channel from the error.
    pub fn from_error(kind: EventKind, err: &Error) -> Self {
        let ev = Event::new(kind)
            .with_reason(err.as_message())
            .with_label(err.as_label());
        match err {
            Error::StreamOpen { instance, .. } | Error::StreamRead { instance, .. } => {
                ev.with_instance(instance.to_string())
            }
            Error::ChannelConflict { name, .. } | Error::ChannelAdmin { name, .. } => {
                ev.with_channel(name.as_str())
            }
            Error::Publish { channel, .. } => ev.with_channel(channel.as_str()),
            Error::Watch { .. } => ev,
        }
    }

    /// Attaches instance identity, application and phase of a snapshot.
    #[inline]
    pub fn with_snapshot(self, instance: &Instance) -> Self {
        self.with_instance(instance.id.to_string())
            .with_app(instance.app().as_str())
            .with_phase(instance.phase)
    }

    #[inline]
    pub fn with_instance(mut self, instance: impl Into<Arc<str>>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    #[inline]
    pub fn with_app(mut self, app: impl Into<Arc<str>>) -> Self {
        self.app = Some(app.into());
        self
    }

    #[inline]
    pub fn with_channel(mut self, channel: impl Into<Arc<str>>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    #[inline]
    pub fn with_bytes(mut self, n: usize) -> Self {
        self.bytes = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}
