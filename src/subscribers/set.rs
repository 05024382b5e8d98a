//! # Delivery of runtime events to subscribers.
//!
//! Each subscriber owns a bounded queue drained by its own task, so [`SubscriberSet::emit`]
//! never waits on a subscriber. Events keep their order within one subscriber only.
//!
//! A full queue drops the event for that subscriber alone and logs a warning. A panic in
//! `on_event` is logged and the next event is still delivered.
//!
//! ```text
//! listener ─► emit(&Event) ─┬─► queue(LogWriter) ─► on_event
//!                           └─► queue(custom)    ─► on_event
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::Event;

use super::Subscribe;

struct Lane {
    subscriber: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// The subscribers of one coordinator, each behind its own queue.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    drains: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Spawns one draining task per subscriber. Needs a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (lanes, drains) = subs
            .into_iter()
            .map(|sub| {
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    subscriber: sub.name(),
                    queue,
                };
                (lane, tokio::spawn(drain(sub, rx)))
            })
            .unzip();

        Self { lanes, drains }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for lane in &self.lanes {
            let reason = match lane.queue.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "queue full",
                Err(mpsc::error::TrySendError::Closed(_)) => "subscriber gone",
            };
            tracing::warn!(
                subscriber = lane.subscriber,
                kind = ?event.kind,
                reason,
                "event dropped"
            );
        }
    }

    /// Closes every queue and waits until the subscribers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for drain in self.drains {
            let _ = drain.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(event) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&event))
            .catch_unwind()
            .await;
        if let Err(panic) = handled {
            tracing::error!(subscriber = sub.name(), kind = ?event.kind, ?panic, "subscriber panicked");
        }
    }
}
