//! # logvisor
//!
//! **Logvisor** ships the logs of Kubernetes pods to Kafka, one topic per application.
//!
//! It watches the pods of one namespace, creates a topic named after each pod's `app`
//! label, follows the log of every running pod and forwards it chunk by chunk to that
//! topic. When a pod goes away its stream is stopped and a topic is deleted.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌─────────────────┐
//!   │ InstanceWatcher │  (pod watch; nothing before the initial sync)
//!   └────────┬────────┘
//!            │ InstanceEvent: Added / Updated / Deleted
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator                                                      │
//! │  - Registry (instance → forwarding task, one at most)             │
//! │  - ChannelProvisioner (create on Added, delete after Deleted)     │
//! │  - LogSource (open on first Running update)                       │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  Forwarder   │   │  Forwarder   │   │  Forwarder   │   │
//!     │ read → send  │   │ read → send  │   │ read → send  │   │
//!     │ → pace       │   │ → pace       │   │ → pace       │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publisher        │                  │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                     LogWriter   custom     ...
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                               |
//! |-------------------|-----------------------------------------------------------|--------------------------------------------------|
//! | **Coordination**  | Instance lifecycle → streams and topics                   | [`Coordinator`], [`CoordinatorBuilder`]          |
//! | **Clients**       | Injected collaborators                                    | [`LogSource`], [`Publisher`], [`ChannelProvisioner`], [`InstanceWatcher`] |
//! | **Events**        | Structured runtime events and subscribers                 | [`Event`], [`EventKind`], [`Subscribe`]          |
//! | **Errors**        | Non-fatal and fatal error kinds                           | [`Error`], [`RuntimeError`]                      |
//! | **Configuration** | Environment driven settings                               | [`Config`]                                       |
//!
//! ## Cargo features
//! - `kube` (default): Kubernetes log source and pod watcher.
//! - `kafka`: rdkafka publisher; together with `kube` enables the `logvisor` binary.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use logvisor::{ChannelProvisioner, Config, Coordinator, Error, InstanceIdentity, LogSource, LogStream, Publisher};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl LogSource for Empty {
//!     async fn open(&self, _id: &InstanceIdentity) -> Result<LogStream, Error> {
//!         Ok(Box::pin(tokio::io::empty()))
//!     }
//! }
//!
//! impl Publisher for Empty {
//!     fn publish(&self, _channel: &str, _key: &str, _payload: &[u8]) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl ChannelProvisioner for Empty {
//!     async fn create(&self, _name: &str) -> Result<(), Error> { Ok(()) }
//!     async fn delete(&self, _name: &str) -> Result<(), Error> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { grace: Duration::from_secs(1), ..Config::default() };
//!     let coord = Coordinator::builder(cfg)
//!         .with_log_source(Arc::new(Empty))
//!         .with_publisher(Arc::new(Empty))
//!         .with_provisioner(Arc::new(Empty))
//!         .build()?;
//!
//!     // no instances: the watch ends immediately and the coordinator shuts down
//!     coord.run(futures::stream::empty()).await?;
//!     Ok(())
//! }
//! ```
mod clients;
mod config;
mod core;
mod error;
mod events;
mod model;
mod subscribers;
mod telemetry;

#[cfg(test)]
mod testkit;

// ---- Public re-exports ----

pub use clients::{
    ChannelProvisioner, HttpChannelProvisioner, InstanceCache, InstanceWatcher, LogSource,
    LogStream, Publisher, WatchSignal, translate,
};
pub use config::{
    AdminConfig, AuthScheme, ChannelDeleteKey, Config, DEFAULT_NAMESPACE, KafkaConfig, LogFormat,
};
pub use self::core::{Coordinator, CoordinatorBuilder, ExitReason, ForwarderParams, wait_for_shutdown_signal};
pub use error::{ChannelOp, Error, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use model::{APP_LABEL, ApplicationIdentity, Instance, InstanceEvent, InstanceIdentity, Phase};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use telemetry::init_tracing;

// Kubernetes adapters.
// Enable with: `--features kube` (default)
#[cfg(feature = "kube")]
pub use clients::{KubeLogSource, KubeWatcher, connect, instance_from_pod};

// Kafka producer.
// Enable with: `--features kafka`
#[cfg(feature = "kafka")]
pub use clients::KafkaPublisher;
