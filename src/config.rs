//! # Runtime configuration.
//!
//! [`Config`] gathers everything the process needs: the watched namespace, how to reach the
//! cluster, Kafka and its admin API, and the coordinator's own knobs (chunk size, pacing,
//! shutdown grace).
//!
//! Values come from the environment via [`Config::from_env`]; tests use
//! [`Config::from_lookup`] with a closure instead of touching the process environment.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use logvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.pace = Duration::from_millis(250);
//! cfg.chunk_size = 4096;
//!
//! assert_eq!(cfg.namespace, "default");
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::RuntimeError;

/// Namespace watched when `NAMESPACE` is unset or empty.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Which name a topic is deleted by when an instance goes away.
///
/// Topics are created under the application label, but by default they are deleted under
/// the instance name. The two only agree when a pod is named after its app; with several
/// replicas the delete targets a topic that was never created. The default keeps that
/// behavior until it is settled; `Application` deletes the topic that was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelDeleteKey {
    #[default]
    InstanceName,
    Application,
}

impl FromStr for ChannelDeleteKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instance" | "pod" => Ok(Self::InstanceName),
            "application" | "app" => Ok(Self::Application),
            other => Err(format!("expected `instance` or `application`, got {other:?}")),
        }
    }
}

/// Authorization scheme sent to the topic admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    #[default]
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!("expected `basic` or `bearer`, got {other:?}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got {other:?}")),
        }
    }
}

/// Kafka producer settings.
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    pub host: String,
    pub port: u16,
    /// SASL PLAIN over SSL is enabled when both username and password are set.
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl KafkaConfig {
    /// `host:port` for `bootstrap.servers`.
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9092,
            username: None,
            password: None,
        }
    }
}

/// Topic admin REST API settings.
#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Base URL; `/topics` is appended.
    pub url: String,
    pub api_key: SecretString,
    pub scheme: AuthScheme,
    pub partitions: u32,
    pub replication_factor: u32,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: SecretString::from(String::new()),
            scheme: AuthScheme::Basic,
            partitions: 1,
            replication_factor: 3,
        }
    }
}

/// Global configuration.
///
/// ## Field semantics
/// - `namespace`: only pods in this namespace are watched and streamed
/// - `kubeconfig`: `Some(path)` uses that kubeconfig, `None` uses in-cluster credentials
/// - `chunk_size`: maximum bytes read (and published) per chunk (min 1)
/// - `pace`: wait between two reads of the same stream
/// - `grace`: how long shutdown waits for forwarding tasks to exit
/// - `resync`: how often every known instance is re-announced as updated (`0s` = never)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    pub namespace: String,
    pub kubeconfig: Option<PathBuf>,
    pub kafka: KafkaConfig,
    pub admin: AdminConfig,
    pub chunk_size: usize,
    pub pace: Duration,
    pub grace: Duration,
    pub resync: Duration,
    pub bus_capacity: usize,
    pub delete_key: ChannelDeleteKey,
    pub log_format: LogFormat,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `namespace = "default"`
    /// - `chunk_size = 1024`
    /// - `pace = 1s`
    /// - `grace = 30s`
    /// - `resync = 10s`
    /// - `bus_capacity = 1024`
    /// - `delete_key = ChannelDeleteKey::InstanceName`
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            kubeconfig: None,
            kafka: KafkaConfig::default(),
            admin: AdminConfig::default(),
            chunk_size: 1024,
            pace: Duration::from_secs(1),
            grace: Duration::from_secs(30),
            resync: Duration::from_secs(10),
            bus_capacity: 1024,
            delete_key: ChannelDeleteKey::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; empty values count as unset.
    ///
    /// `KAFKA_REST_API` and `KAFKA_HOST` are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Config::default();

        if let Some(ns) = get("NAMESPACE") {
            cfg.namespace = ns;
        }
        cfg.kubeconfig = get("WITH_KUBECONFIG").map(PathBuf::from);

        cfg.kafka.host = get("KAFKA_HOST").ok_or_else(|| required("KAFKA_HOST"))?;
        if let Some(port) = get("KAFKA_PORT") {
            cfg.kafka.port = parse("KAFKA_PORT", &port)?;
        }
        cfg.kafka.username = get("KAFKA_USERNAME");
        cfg.kafka.password = get("KAFKA_PASSWORD").map(SecretString::from);

        cfg.admin.url = get("KAFKA_REST_API").ok_or_else(|| required("KAFKA_REST_API"))?;
        if let Some(key) = get("KAFKA_REST_API_KEY") {
            cfg.admin.api_key = SecretString::from(key);
        }
        if let Some(scheme) = get("KAFKA_REST_AUTH_SCHEME") {
            cfg.admin.scheme = parse("KAFKA_REST_AUTH_SCHEME", &scheme)?;
        }
        if let Some(v) = get("TOPIC_PARTITIONS") {
            cfg.admin.partitions = parse("TOPIC_PARTITIONS", &v)?;
        }
        if let Some(v) = get("TOPIC_REPLICATION_FACTOR") {
            cfg.admin.replication_factor = parse("TOPIC_REPLICATION_FACTOR", &v)?;
        }

        if let Some(v) = get("LOG_CHUNK_BYTES") {
            let n: usize = parse("LOG_CHUNK_BYTES", &v)?;
            if n == 0 {
                return Err(RuntimeError::Config {
                    key: "LOG_CHUNK_BYTES",
                    reason: "must be greater than zero".to_string(),
                });
            }
            cfg.chunk_size = n;
        }
        if let Some(v) = get("LOG_PACE_MS") {
            cfg.pace = Duration::from_millis(parse("LOG_PACE_MS", &v)?);
        }
        if let Some(v) = get("SHUTDOWN_GRACE_SECS") {
            cfg.grace = Duration::from_secs(parse("SHUTDOWN_GRACE_SECS", &v)?);
        }
        if let Some(v) = get("RESYNC_SECS") {
            cfg.resync = Duration::from_secs(parse("RESYNC_SECS", &v)?);
        }
        if let Some(v) = get("CHANNEL_DELETE_KEY") {
            cfg.delete_key = parse("CHANNEL_DELETE_KEY", &v)?;
        }
        if let Some(v) = get("LOG_FORMAT") {
            cfg.log_format = parse("LOG_FORMAT", &v)?;
        }

        Ok(cfg)
    }

    /// Chunk capacity clamped to a minimum of 1.
    #[inline]
    pub fn chunk_size_clamped(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Resync period, `None` when disabled.
    pub fn resync_period(&self) -> Option<Duration> {
        (!self.resync.is_zero()).then_some(self.resync)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

fn required(key: &'static str) -> RuntimeError {
    RuntimeError::Config {
        key,
        reason: "must be set".to_string(),
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, RuntimeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| RuntimeError::Config {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}
