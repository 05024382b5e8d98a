//! # Publisher.
//!
//! Hands a payload to the message broker. `publish` only enqueues: an `Err` means the
//! record could not be queued locally, never that delivery failed later.

use std::time::Duration;

use crate::error::Error;

/// Enqueues records for delivery.
pub trait Publisher: Send + Sync + 'static {
    /// Enqueues `payload` for topic `channel` with record key `key`.
    ///
    /// Failures are reported as [`Error::Publish`].
    fn publish(&self, channel: &str, key: &str, payload: &[u8]) -> Result<(), Error>;

    /// Waits up to the given timeout for queued records to be delivered. Called once at
    /// shutdown. The default has nothing queued and returns at once.
    fn flush(&self, _timeout: Duration) {}
}
