//! # Log source.
//!
//! A [`LogSource`] opens the log of one instance in follow mode. The returned
//! [`LogStream`] yields bytes until the instance's log ends, an error occurs, or the
//! stream is dropped; dropping it is how a stream is closed.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Error;
use crate::model::InstanceIdentity;

/// Open, follow-mode byte stream of one instance's log output.
pub type LogStream = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// Opens log streams.
///
/// Failures are reported as [`Error::StreamOpen`].
#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    async fn open(&self, instance: &InstanceIdentity) -> Result<LogStream, Error>;
}
