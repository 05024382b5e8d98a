//! # Coordinator: instance lifecycle → log streams and topics.
//!
//! The [`Coordinator`] consumes [`InstanceEvent`]s one at a time and keeps exactly one
//! forwarding task per running instance.
//!
//! ## Per-instance state machine
//! ```text
//!            Updated(new.phase == Running) && open ok
//!   Absent ───────────────────────────────────────────► Streaming
//!     ▲                                                    │
//!     └─────────── Deleted: stop → join → delete topic ────┘
//!
//! Added                 → create topic(app)       (independent of streaming)
//! Updated while Streaming → no-op
//! Deleted while Absent    → no-op
//! ```
//!
//! ## Event flow
//! ```text
//! InstanceWatcher ──► run() ──► handle(InstanceEvent)
//!                                 ├─► ChannelProvisioner (create / delete)
//!                                 ├─► Registry::admit ──► tokio::spawn(Forwarder::run)
//!                                 └─► Bus.publish(Event) ──► subscriber listener ──► SubscriberSet
//! ```
//!
//! ## Shutdown path
//! ```text
//! signal or end of watch
//!   └─► Bus.publish(ShutdownRequested)
//!   └─► runtime_token.cancel()        → every forwarding task stops
//!   └─► join all within cfg.grace
//!          ├─ all joined → AllStoppedWithin
//!          └─ timeout    → GraceExceeded, RuntimeError::GraceExceeded
//!   └─► Publisher::flush(cfg.grace)
//!   └─► subscriber listener drained and stopped
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::clients::{ChannelProvisioner, LogSource, Publisher};
use crate::config::{ChannelDeleteKey, Config};
use crate::core::forwarder::{Forwarder, ForwarderParams};
use crate::core::registry::{Admission, Registry};
use crate::core::shutdown;
use crate::error::{Error, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::model::{Instance, InstanceEvent, InstanceIdentity};

/// Keeps log streams and topics in step with the watched instances.
pub struct Coordinator {
    cfg: Config,
    bus: Bus,
    registry: Registry,
    source: Arc<dyn LogSource>,
    publisher: Arc<dyn Publisher>,
    provisioner: Arc<dyn ChannelProvisioner>,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        source: Arc<dyn LogSource>,
        publisher: Arc<dyn Publisher>,
        provisioner: Arc<dyn ChannelProvisioner>,
        runtime_token: CancellationToken,
        listener_token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            registry: Registry::new(runtime_token.clone()),
            cfg,
            bus,
            source,
            publisher,
            provisioner,
            runtime_token,
            listener_token,
            listener: std::sync::Mutex::new(Some(listener)),
        }
    }

    /// Returns a builder; see [`CoordinatorBuilder`](crate::CoordinatorBuilder).
    pub fn builder(cfg: Config) -> crate::core::CoordinatorBuilder {
        crate::core::CoordinatorBuilder::new(cfg)
    }

    /// Processes `events` until a termination signal arrives or the stream ends, then
    /// shuts down.
    pub async fn run<S>(&self, events: S) -> Result<(), RuntimeError>
    where
        S: Stream<Item = Result<InstanceEvent, Error>> + Send,
    {
        let signal = async {
            if let Err(e) = shutdown::wait_for_shutdown_signal().await {
                tracing::error!(error = %e, "failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        };
        self.run_with_shutdown(events, signal).await
    }

    /// Like [`run`](Self::run), with a caller-supplied shutdown trigger.
    pub async fn run_with_shutdown<S, F>(&self, events: S, signal: F) -> Result<(), RuntimeError>
    where
        S: Stream<Item = Result<InstanceEvent, Error>> + Send,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(events);
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                next = events.next() => match next {
                    Some(Ok(ev)) => self.handle(ev).await,
                    Some(Err(e)) => self.bus.publish(Event::from_error(EventKind::WatchFailed, &e)),
                    None => {
                        tracing::warn!("instance watch ended");
                        break;
                    }
                }
            }
        }
        self.shutdown().await
    }

    /// Applies one instance event.
    pub async fn handle(&self, event: InstanceEvent) {
        match event {
            InstanceEvent::Added(instance) => self.on_added(&instance).await,
            InstanceEvent::Updated { old, new } => self.on_updated(&old, &new).await,
            InstanceEvent::Deleted(instance) => self.on_deleted(&instance).await,
        }
    }

    async fn on_added(&self, instance: &Instance) {
        self.bus
            .publish(Event::new(EventKind::InstanceAdded).with_snapshot(instance));

        let app = instance.app();
        let res = self.provisioner.create(app.as_str()).await;
        self.report_channel(EventKind::ChannelCreated, app.as_str(), res);
    }

    async fn on_updated(&self, _old: &Instance, new: &Instance) {
        self.bus
            .publish(Event::new(EventKind::InstanceUpdated).with_snapshot(new));
        if !new.is_running() {
            return;
        }

        let app = new.app();
        let params = self.forwarder_params();
        let publisher = Arc::clone(&self.publisher);
        let bus = self.bus.clone();
        let id = new.id.clone();
        let task_app = app.clone();

        let admission = self
            .registry
            .admit(&new.id, app.clone(), self.source.as_ref(), move |stream, token| {
                let fwd = Forwarder::new(id, task_app, stream, publisher, bus, params);
                tokio::spawn(fwd.run(token))
            })
            .await;

        match admission {
            Admission::Started => self.bus.publish(
                Event::new(EventKind::StreamStarted)
                    .with_instance(new.id.to_string())
                    .with_app(app.as_str())
                    .with_channel(app.as_str()),
            ),
            Admission::AlreadyStreaming => self.bus.publish(
                Event::new(EventKind::StreamAlreadyActive).with_instance(new.id.to_string()),
            ),
            Admission::Rejected(e) => self
                .bus
                .publish(Event::from_error(EventKind::StreamOpenFailed, &e)),
        }
    }

    async fn on_deleted(&self, instance: &Instance) {
        self.bus
            .publish(Event::new(EventKind::InstanceDeleted).with_snapshot(instance));

        let Some(handle) = self.registry.remove(&instance.id).await else {
            return;
        };
        handle.stop();
        if let Err(e) = handle.join.await {
            tracing::error!(instance = %instance.id, error = %e, "forwarding task panicked");
        }
        self.bus.publish(
            Event::new(EventKind::StreamStopped)
                .with_instance(instance.id.to_string())
                .with_app(handle.app.as_str()),
        );

        let channel = match self.cfg.delete_key {
            ChannelDeleteKey::InstanceName => instance.id.name.clone(),
            ChannelDeleteKey::Application => handle.app.as_str().to_string(),
        };
        let res = self.provisioner.delete(&channel).await;
        self.report_channel(EventKind::ChannelDeleted, &channel, res);
    }

    fn report_channel(&self, ok: EventKind, channel: &str, res: Result<(), Error>) {
        let ev = match res {
            Ok(()) => Event::new(ok).with_channel(channel),
            Err(e) if e.is_conflict() => Event::from_error(EventKind::ChannelConflict, &e),
            Err(e) => Event::from_error(EventKind::ChannelFailed, &e),
        };
        self.bus.publish(ev);
    }

    fn forwarder_params(&self) -> ForwarderParams {
        ForwarderParams {
            chunk_size: self.cfg.chunk_size_clamped(),
            pace: self.cfg.pace,
        }
    }

    /// Stops every stream, waits for the tasks within the grace period, flushes the
    /// publisher and stops event delivery.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] listing the streams that did not stop in time.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let grace = self.cfg.grace;
        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();
        for (id, mut handle) in self.registry.drain().await {
            handle.stop();
            if time::timeout_at(deadline, &mut handle.join).await.is_err() {
                handle.join.abort();
                stuck.push(id.to_string());
            }
        }
        stuck.sort_unstable();

        let res = if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            self.bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        };

        let publisher = Arc::clone(&self.publisher);
        if let Err(e) = tokio::task::spawn_blocking(move || publisher.flush(grace)).await {
            tracing::error!(error = %e, "publisher flush panicked");
        }

        self.listener_token.cancel();
        let listener = self.listener.lock().ok().and_then(|mut l| l.take());
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        res
    }

    /// Instances currently registered as streaming, sorted.
    pub async fn active(&self) -> Vec<InstanceIdentity> {
        self.registry.list().await
    }

    /// True if `id` has a registered forwarding task.
    pub async fn is_streaming(&self, id: &InstanceIdentity) -> bool {
        self.registry.contains(id).await
    }

    /// Receiver of all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}
