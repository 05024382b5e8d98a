//! # Stream registry: which instances are being streamed.
//!
//! Maps [`InstanceIdentity`] to the handle of its forwarding task.
//!
//! ## Rules
//! - At most one entry per instance; the absence check, the stream open and the insert
//!   happen under one lock, so two Running updates can never open two streams.
//! - Forwarding tasks never touch the registry. A task that ended on its own leaves its
//!   entry in place until the instance is deleted; stopping it then is a no-op.
//! - Every task token is a child of the runtime token, so cancelling the runtime stops all.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clients::{LogSource, LogStream};
use crate::core::forwarder::ExitReason;
use crate::error::Error;
use crate::model::{ApplicationIdentity, InstanceIdentity};

/// Handle to one forwarding task.
pub struct StreamHandle {
    /// Application resolved when the stream started.
    pub app: ApplicationIdentity,
    pub cancel: CancellationToken,
    pub join: JoinHandle<ExitReason>,
}

impl StreamHandle {
    /// Signals the task to stop. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Outcome of [`Registry::admit`].
pub enum Admission {
    Started,
    AlreadyStreaming,
    Rejected(Error),
}

pub struct Registry {
    streams: Mutex<HashMap<InstanceIdentity, StreamHandle>>,
    runtime_token: CancellationToken,
}

impl Registry {
    pub fn new(runtime_token: CancellationToken) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            runtime_token,
        }
    }

    /// Opens a stream for `id` and registers the task built by `spawn`, unless `id` is
    /// already registered.
    pub async fn admit<F>(
        &self,
        id: &InstanceIdentity,
        app: ApplicationIdentity,
        source: &dyn LogSource,
        spawn: F,
    ) -> Admission
    where
        F: FnOnce(LogStream, CancellationToken) -> JoinHandle<ExitReason>,
    {
        let mut streams = self.streams.lock().await;
        if streams.contains_key(id) {
            return Admission::AlreadyStreaming;
        }

        let stream = match source.open(id).await {
            Ok(stream) => stream,
            Err(e) => return Admission::Rejected(e),
        };
        let cancel = self.runtime_token.child_token();
        let join = spawn(stream, cancel.clone());
        streams.insert(id.clone(), StreamHandle { app, cancel, join });
        Admission::Started
    }

    /// Unregisters `id` and returns its handle.
    pub async fn remove(&self, id: &InstanceIdentity) -> Option<StreamHandle> {
        self.streams.lock().await.remove(id)
    }

    pub async fn contains(&self, id: &InstanceIdentity) -> bool {
        self.streams.lock().await.contains_key(id)
    }

    /// Returns the registered instances, sorted.
    pub async fn list(&self) -> Vec<InstanceIdentity> {
        let streams = self.streams.lock().await;
        let mut ids: Vec<InstanceIdentity> = streams.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.streams.lock().await.len()
    }

    /// Removes every entry.
    pub async fn drain(&self) -> Vec<(InstanceIdentity, StreamHandle)> {
        self.streams.lock().await.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MockSource;

    fn idle(_stream: LogStream, token: CancellationToken) -> JoinHandle<ExitReason> {
        tokio::spawn(async move {
            token.cancelled().await;
            ExitReason::Stopped
        })
    }

    #[tokio::test]
    async fn second_admission_is_suppressed() {
        let registry = Registry::new(CancellationToken::new());
        let source = MockSource::default();
        let id = InstanceIdentity::new("ns", "app-1");

        let first = registry.admit(&id, "checkout".into(), &source, idle).await;
        let second = registry.admit(&id, "checkout".into(), &source, idle).await;

        assert!(matches!(first, Admission::Started));
        assert!(matches!(second, Admission::AlreadyStreaming));
        assert_eq!(source.opens(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn failed_open_registers_nothing() {
        let registry = Registry::new(CancellationToken::new());
        let source = MockSource::default();
        source.fail_next_opens(1);
        let id = InstanceIdentity::new("ns", "app-1");

        let res = registry.admit(&id, "checkout".into(), &source, idle).await;
        assert!(matches!(res, Admission::Rejected(Error::StreamOpen { .. })));
        assert!(!registry.contains(&id).await);
    }

    #[tokio::test]
    async fn runtime_cancel_reaches_every_task() {
        let runtime = CancellationToken::new();
        let registry = Registry::new(runtime.clone());
        let source = MockSource::default();
        for name in ["b", "a"] {
            let id = InstanceIdentity::new("ns", name);
            registry.admit(&id, "x".into(), &source, idle).await;
        }
        assert_eq!(
            registry.list().await,
            vec![InstanceIdentity::new("ns", "a"), InstanceIdentity::new("ns", "b")]
        );

        runtime.cancel();
        for (_, handle) in registry.drain().await {
            assert_eq!(handle.join.await.unwrap(), ExitReason::Stopped);
        }
        assert_eq!(registry.len().await, 0);
    }
}
