use std::process::ExitCode;
use std::sync::Arc;

use logvisor::{
    Config, Coordinator, HttpChannelProvisioner, InstanceWatcher, KafkaPublisher, KubeLogSource,
    KubeWatcher, LogWriter, RuntimeError, Subscribe, connect, init_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // tracing is not installed yet
            eprintln!("logvisor: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(cfg.log_format) {
        eprintln!("logvisor: {e}");
        return ExitCode::FAILURE;
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(label = e.as_label(), error = %e.as_message(), "logvisor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config) -> Result<(), RuntimeError> {
    let client = connect(&cfg).await?;
    let publisher = KafkaPublisher::new(&cfg.kafka)?;
    let provisioner = HttpChannelProvisioner::new(&cfg.admin)?;
    tracing::info!(
        namespace = %cfg.namespace,
        bootstrap = %cfg.kafka.bootstrap_servers(),
        "watching pods"
    );

    let watcher =
        KubeWatcher::new(client.clone(), cfg.namespace.clone()).with_resync(cfg.resync_period());
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let coordinator = Coordinator::builder(cfg)
        .with_subscribers(subscribers)
        .with_log_source(Arc::new(KubeLogSource::new(client)))
        .with_publisher(Arc::new(publisher))
        .with_provisioner(Arc::new(provisioner))
        .build()?;

    coordinator.run(watcher.events()).await
}
