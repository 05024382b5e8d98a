//! Kafka publisher over librdkafka.
//!
//! `publish` only enqueues into the producer's local buffer; delivery reports are not
//! awaited. Remaining records are flushed once at shutdown.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use secrecy::ExposeSecret;

use crate::clients::Publisher;
use crate::config::KafkaConfig;
use crate::error::{Error, RuntimeError};

const MESSAGE_TIMEOUT_MS: &str = "5000";

pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Creates the producer. SASL PLAIN over SSL is enabled when both username and
    /// password are configured.
    pub fn new(cfg: &KafkaConfig) -> Result<Self, RuntimeError> {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", cfg.bootstrap_servers());
        config.set("message.timeout.ms", MESSAGE_TIMEOUT_MS);

        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanism", "PLAIN")
                .set("sasl.username", user)
                .set("sasl.password", pass.expose_secret());
        }

        let producer: FutureProducer = config.create().map_err(|e| RuntimeError::ClientInit {
            client: "kafka producer",
            reason: e.to_string(),
        })?;
        Ok(Self { producer })
    }
}

impl Publisher for KafkaPublisher {
    fn publish(&self, channel: &str, key: &str, payload: &[u8]) -> Result<(), Error> {
        let record = FutureRecord::to(channel).key(key).payload(payload);
        match self.producer.send_result(record) {
            // delivery report intentionally not awaited
            Ok(_delivery) => Ok(()),
            Err((e, _record)) => Err(Error::Publish {
                channel: channel.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            tracing::warn!(error = %e, "kafka producer flush incomplete");
        }
    }
}
