//! Error types used by the logvisor runtime and its clients.
//!
//! This module defines two enums:
//!
//! - [`Error`] non-fatal failures; reported through the event bus and logged, never retried.
//! - [`RuntimeError`] fatal failures; the process cannot proceed.
//!
//! Both provide `as_label` (stable snake_case for logs) and `as_message`.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::model::InstanceIdentity;

/// Topic administration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    Create,
    Delete,
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOp::Create => f.write_str("create"),
            ChannelOp::Delete => f.write_str("delete"),
        }
    }
}

/// # Non-fatal errors.
///
/// Each variant is turned into an [`Event`](crate::Event) and handed to subscribers; the
/// caller then carries on with the next event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// The log stream of an instance could not be opened.
    #[error("failed to open log stream for {instance}: {reason}")]
    StreamOpen {
        instance: InstanceIdentity,
        reason: String,
    },

    /// A log stream ended: read failure, end of stream, or closed by stop.
    #[error("log stream for {instance} ended: {reason}")]
    StreamRead {
        instance: InstanceIdentity,
        reason: String,
    },

    /// Topic already exists (create) or does not exist (delete).
    #[error("channel {op} for {name:?} conflicted (error_code {code})")]
    ChannelConflict {
        op: ChannelOp,
        name: String,
        code: i64,
    },

    /// Topic administration failed for any other reason.
    #[error("channel {op} for {name:?} failed: {reason}")]
    ChannelAdmin {
        op: ChannelOp,
        name: String,
        reason: String,
    },

    /// A chunk could not be enqueued for delivery.
    #[error("failed to publish to channel {channel:?}: {reason}")]
    Publish { channel: String, reason: String },

    /// The instance watch reported an error (the watcher keeps going).
    #[error("instance watch error: {reason}")]
    Watch { reason: String },
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use logvisor::{ChannelOp, Error};
    ///
    /// let err = Error::ChannelConflict { op: ChannelOp::Create, name: "checkout".into(), code: 40002 };
    /// assert_eq!(err.as_label(), "channel_conflict");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::StreamOpen { .. } => "stream_open",
            Error::StreamRead { .. } => "stream_read",
            Error::ChannelConflict { .. } => "channel_conflict",
            Error::ChannelAdmin { .. } => "channel_admin",
            Error::Publish { .. } => "publish",
            Error::Watch { .. } => "watch",
        }
    }

    /// Returns a human-readable message without the variant prefix.
    pub fn as_message(&self) -> String {
        match self {
            Error::StreamOpen { reason, .. }
            | Error::StreamRead { reason, .. }
            | Error::ChannelAdmin { reason, .. }
            | Error::Publish { reason, .. }
            | Error::Watch { reason } => reason.clone(),
            Error::ChannelConflict { op, code, .. } => match op {
                ChannelOp::Create => format!("channel already exists (code {code})"),
                ChannelOp::Delete => format!("channel not in expected state (code {code})"),
            },
        }
    }

    /// True for the "already exists / does not exist" outcome of topic administration.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ChannelConflict { .. })
    }
}

/// # Fatal errors.
///
/// These stop startup or report an unclean shutdown; the binary exits non-zero.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A collaborator client could not be initialized.
    #[error("failed to initialize {client} client: {reason}")]
    ClientInit {
        client: &'static str,
        reason: String,
    },

    /// Missing or malformed configuration value.
    #[error("invalid configuration {key}: {reason}")]
    Config { key: &'static str, reason: String },

    /// The tracing subscriber could not be installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Telemetry { reason: String },

    /// Shutdown grace period was exceeded; some streams did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        grace: Duration,
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ClientInit { .. } => "client_init",
            RuntimeError::Config { .. } => "config",
            RuntimeError::Telemetry { .. } => "telemetry",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ClientInit { client, reason } => format!("{client}: {reason}"),
            RuntimeError::Config { key, reason } => format!("{key}: {reason}"),
            RuntimeError::Telemetry { reason } => reason.clone(),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck streams={stuck:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let id = InstanceIdentity::new("ns", "p");
        assert_eq!(
            Error::StreamOpen { instance: id.clone(), reason: "x".into() }.as_label(),
            "stream_open"
        );
        assert_eq!(
            Error::StreamRead { instance: id, reason: "x".into() }.as_label(),
            "stream_read"
        );
        assert_eq!(
            RuntimeError::ClientInit { client: "kube", reason: "x".into() }.as_label(),
            "client_init"
        );
    }

    #[test]
    fn only_conflict_is_conflict() {
        let conflict = Error::ChannelConflict {
            op: ChannelOp::Create,
            name: "a".into(),
            code: 40002,
        };
        let admin = Error::ChannelAdmin {
            op: ChannelOp::Create,
            name: "a".into(),
            reason: "boom".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!admin.is_conflict());
        assert_eq!(admin.as_message(), "boom");
    }

    #[test]
    fn display_includes_instance() {
        let err = Error::StreamOpen {
            instance: InstanceIdentity::new("ns", "app-1"),
            reason: "pod not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open log stream for ns/app-1: pod not found"
        );
    }
}
