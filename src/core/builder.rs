use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::{
    clients::{ChannelProvisioner, LogSource, Publisher},
    config::Config,
    error::RuntimeError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::coordinator::Coordinator;

/// Builder for a [`Coordinator`] with injected clients.
pub struct CoordinatorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    source: Option<Arc<dyn LogSource>>,
    publisher: Option<Arc<dyn Publisher>>,
    provisioner: Option<Arc<dyn ChannelProvisioner>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            source: None,
            publisher: None,
            provisioner: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (instances, streams, topics, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn with_log_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn ChannelProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Builds the coordinator and starts event delivery to the subscribers.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`RuntimeError::ClientInit`] if a client was not supplied.
    pub fn build(self) -> Result<Coordinator, RuntimeError> {
        let source = self.source.ok_or_else(|| missing("log source"))?;
        let publisher = self.publisher.ok_or_else(|| missing("publisher"))?;
        let provisioner = self.provisioner.ok_or_else(|| missing("channel provisioner"))?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers);
        let listener_token = CancellationToken::new();
        let listener = spawn_subscriber_listener(&bus, subs, listener_token.clone());

        Ok(Coordinator::new_internal(
            self.cfg,
            bus,
            source,
            publisher,
            provisioner,
            CancellationToken::new(),
            listener_token,
            listener,
        ))
    }
}

fn missing(client: &'static str) -> RuntimeError {
    RuntimeError::ClientInit {
        client,
        reason: "not configured".to_string(),
    }
}

/// Forwards bus events to the subscriber set until `stop` is cancelled; then delivers what
/// is still buffered and waits for the subscriber workers.
fn spawn_subscriber_listener(
    bus: &Bus,
    set: SubscriberSet,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        set.shutdown().await;
    })
}
