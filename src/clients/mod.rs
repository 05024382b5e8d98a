//! # Collaborator clients.
//!
//! The coordinator talks to the outside world only through the traits in this module:
//! - [`LogSource`] opens a follow-mode log stream for an instance
//! - [`Publisher`] enqueues a chunk for a topic (fire-and-forget)
//! - [`ChannelProvisioner`] creates and deletes topics
//! - [`InstanceWatcher`] yields instance lifecycle events after the initial sync
//!
//! Production adapters:
//! - [`HttpChannelProvisioner`] topic admin REST API over `reqwest`
//! - `KubeLogSource`, `KubeWatcher` (feature `kube`)
//! - `KafkaPublisher` (feature `kafka`)

mod admin;
mod provisioner;
mod publisher;
mod source;
mod watcher;

#[cfg(feature = "kafka")]
mod kafka;
#[cfg(feature = "kube")]
mod k8s;

pub use admin::HttpChannelProvisioner;
pub use provisioner::ChannelProvisioner;
pub use publisher::Publisher;
pub use source::{LogSource, LogStream};
pub use watcher::{InstanceCache, InstanceWatcher, WatchSignal, translate};

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
#[cfg(feature = "kube")]
pub use k8s::{KubeLogSource, KubeWatcher, connect, instance_from_pod};
