//! Kubernetes adapters: pod log streams and the pod watch.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Client, ResourceExt};
use tokio_util::compat::FuturesAsyncReadCompatExt;

use crate::clients::{InstanceWatcher, LogSource, LogStream, WatchSignal, translate};
use crate::config::Config;
use crate::error::{Error, RuntimeError};
use crate::model::{Instance, InstanceEvent, InstanceIdentity, Phase};

/// Builds the API client from the kubeconfig file in `cfg`, or from the in-cluster
/// service account when none is configured.
pub async fn connect(cfg: &Config) -> Result<Client, RuntimeError> {
    let init_err = |reason: String| RuntimeError::ClientInit {
        client: "kubernetes",
        reason,
    };

    let kube_cfg = match &cfg.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| init_err(format!("{}: {e}", path.display())))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| init_err(e.to_string()))?
        }
        None => kube::Config::incluster().map_err(|e| init_err(e.to_string()))?,
    };

    Client::try_from(kube_cfg).map_err(|e| init_err(e.to_string()))
}

/// Snapshot of a pod: identity, labels and phase.
pub fn instance_from_pod(pod: &Pod) -> Instance {
    let namespace = pod.namespace().unwrap_or_default();
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(Phase::from)
        .unwrap_or_default();

    let mut instance = Instance::new(InstanceIdentity::new(namespace, pod.name_any()), phase);
    instance.labels = pod.labels().clone();
    instance
}

/// Follows container logs of pods through the API server.
#[derive(Clone)]
pub struct KubeLogSource {
    client: Client,
}

impl KubeLogSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for KubeLogSource {
    async fn open(&self, id: &InstanceIdentity) -> Result<LogStream, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &id.namespace);
        let params = LogParams {
            follow: true,
            ..LogParams::default()
        };

        let reader = api
            .log_stream(&id.name, &params)
            .await
            .map_err(|e| Error::StreamOpen {
                instance: id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Box::pin(reader.compat()))
    }
}

/// Namespace-scoped pod watch.
#[derive(Clone)]
pub struct KubeWatcher {
    client: Client,
    namespace: String,
    resync: Option<Duration>,
}

impl KubeWatcher {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            resync: None,
        }
    }

    /// Re-announces every known pod each `period`; `None` disables it.
    pub fn with_resync(mut self, period: Option<Duration>) -> Self {
        self.resync = period;
        self
    }
}

impl InstanceWatcher for KubeWatcher {
    fn events(&self) -> BoxStream<'static, Result<InstanceEvent, Error>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let signals = watcher(api, watcher::Config::default())
            .default_backoff()
            .map(|item| {
                item.map(signal).map_err(|e| Error::Watch {
                    reason: e.to_string(),
                })
            });
        translate(signals, self.resync)
    }
}

fn signal(ev: watcher::Event<Pod>) -> WatchSignal {
    match ev {
        watcher::Event::Init => WatchSignal::Init,
        watcher::Event::InitApply(pod) => WatchSignal::InitApply(instance_from_pod(&pod)),
        watcher::Event::InitDone => WatchSignal::InitDone,
        watcher::Event::Apply(pod) => WatchSignal::Apply(instance_from_pod(&pod)),
        watcher::Event::Delete(pod) => WatchSignal::Delete(instance_from_pod(&pod)),
    }
}
