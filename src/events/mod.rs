//! Runtime events: types and broadcast bus.
//!
//! Everything the coordinator and the forwarding tasks want to report (instances seen,
//! streams started or ended, topic administration outcomes, shutdown progress) becomes an
//! [`Event`] on the [`Bus`]. Subscribers turn them into log lines.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator` (instance and channel events, shutdown) and
//!   `Forwarder` (stream ended, chunk published, publish failed).
//! - **Consumers**: the coordinator's subscriber listener, which fans out to the
//!   [`SubscriberSet`](crate::SubscriberSet); tests may subscribe directly.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
