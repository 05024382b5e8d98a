//! Runtime core: stream lifecycle and shutdown.
//!
//! The public API from this module is [`Coordinator`] and its [`CoordinatorBuilder`].
//!
//! Internal modules:
//! - [`coordinator`]: applies instance events, owns the registry, drives shutdown;
//! - [`forwarder`]: runs one log stream into one topic with pacing and cancellation;
//! - [`registry`]: instance → forwarding task handle;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`builder`]: wires clients, bus and subscribers together.

mod builder;
mod coordinator;
mod forwarder;
mod registry;
mod shutdown;

pub use builder::CoordinatorBuilder;
pub use coordinator::Coordinator;
pub use forwarder::{ExitReason, ForwarderParams};
pub use shutdown::wait_for_shutdown_signal;
