//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`], which is the process-wide reporting sink.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Coordinator / Forwarder ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                               │
//!                                                        SubscriberSet::emit
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter   Custom     ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use logvisor::{Event, EventKind, Subscribe};
//!
//! struct StreamCounter;
//!
//! #[async_trait]
//! impl Subscribe for StreamCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::StreamStarted {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "stream-counter"
//!     }
//! }
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
