//! # Topic admin over HTTP.
//!
//! [`HttpChannelProvisioner`] drives a Kafka REST admin endpoint:
//! ```text
//! create: POST   {base}/topics         {"topic_name", "partitions_count", "replication_factor"}
//! delete: DELETE {base}/topics/{name}  {"topic_name"}
//! ```
//! Every request carries `Authorization: <scheme> <key>`.
//!
//! ## Response classification
//! The admin API reports failures in an `error_code` field of the JSON body:
//! - no `error_code` and a 2xx status → `Ok`
//! - `40002` (topic already exists) → [`Error::ChannelConflict`]
//! - `40403` on delete (topic not found) → [`Error::ChannelConflict`]
//! - any other code, or a non-2xx status without a code → [`Error::ChannelAdmin`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::clients::ChannelProvisioner;
use crate::config::{AdminConfig, AuthScheme};
use crate::error::{ChannelOp, Error, RuntimeError};

/// `error_code` returned when the topic already exists.
pub const TOPIC_ALREADY_EXISTS: i64 = 40002;
/// `error_code` returned when the topic does not exist.
pub const TOPIC_NOT_FOUND: i64 = 40403;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct CreateTopic<'a> {
    topic_name: &'a str,
    partitions_count: u32,
    replication_factor: u32,
}

#[derive(Serialize)]
struct DeleteTopic<'a> {
    topic_name: &'a str,
}

#[derive(Deserialize, Default)]
struct AdminReply {
    error_code: Option<i64>,
    message: Option<String>,
}

/// [`ChannelProvisioner`] backed by the Kafka REST admin API.
pub struct HttpChannelProvisioner {
    client: reqwest::Client,
    base_url: String,
    credential: SecretString,
    scheme: AuthScheme,
    partitions: u32,
    replication_factor: u32,
}

impl HttpChannelProvisioner {
    /// Builds the HTTP client.
    ///
    /// Fails with [`RuntimeError::Config`] if the base URL is empty and with
    /// [`RuntimeError::ClientInit`] if the client cannot be constructed.
    pub fn new(cfg: &AdminConfig) -> Result<Self, RuntimeError> {
        if cfg.url.trim().is_empty() {
            return Err(RuntimeError::Config {
                key: "KAFKA_REST_API",
                reason: "must be set".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RuntimeError::ClientInit {
                client: "topic admin",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            credential: cfg.api_key.clone(),
            scheme: cfg.scheme,
            partitions: cfg.partitions,
            replication_factor: cfg.replication_factor,
        })
    }

    fn authorization(&self) -> String {
        format!("{} {}", self.scheme.as_str(), self.credential.expose_secret())
    }

    async fn send(&self, op: ChannelOp, name: &str, request: RequestBuilder) -> Result<(), Error> {
        let response = request
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| admin_error(op, name, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| admin_error(op, name, format!("failed to read response body: {e}")))?;
        tracing::debug!(%op, channel = name, %status, body = %body, "topic admin response");

        classify(op, name, status, &body)
    }
}

#[async_trait]
impl ChannelProvisioner for HttpChannelProvisioner {
    async fn create(&self, name: &str) -> Result<(), Error> {
        let body = CreateTopic {
            topic_name: name,
            partitions_count: self.partitions,
            replication_factor: self.replication_factor,
        };
        let request = self
            .client
            .post(format!("{}/topics", self.base_url))
            .json(&body);
        self.send(ChannelOp::Create, name, request).await
    }

    async fn delete(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(admin_error(
                ChannelOp::Delete,
                name,
                "channel name is required".to_string(),
            ));
        }
        let request = self
            .client
            .delete(format!("{}/topics/{}", self.base_url, name))
            .json(&DeleteTopic { topic_name: name });
        self.send(ChannelOp::Delete, name, request).await
    }
}

fn admin_error(op: ChannelOp, name: &str, reason: String) -> Error {
    Error::ChannelAdmin {
        op,
        name: name.to_string(),
        reason,
    }
}

/// Maps an admin API response to the provisioning outcome.
fn classify(op: ChannelOp, name: &str, status: StatusCode, body: &str) -> Result<(), Error> {
    let reply: AdminReply = serde_json::from_str(body).unwrap_or_default();
    let conflict = |code| Error::ChannelConflict {
        op,
        name: name.to_string(),
        code,
    };

    match reply.error_code {
        Some(TOPIC_ALREADY_EXISTS) => Err(conflict(TOPIC_ALREADY_EXISTS)),
        Some(TOPIC_NOT_FOUND) if op == ChannelOp::Delete => Err(conflict(TOPIC_NOT_FOUND)),
        Some(code) => Err(admin_error(
            op,
            name,
            format!(
                "error_code {code}: {}",
                reply.message.as_deref().unwrap_or("no message")
            ),
        )),
        None if status.is_success() => Ok(()),
        None => Err(admin_error(op, name, format!("unexpected status {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_error_code() {
        let body = r#"{"kind":"KafkaTopic","topic_name":"checkout"}"#;
        assert!(classify(ChannelOp::Create, "checkout", StatusCode::CREATED, body).is_ok());
        assert!(classify(ChannelOp::Delete, "checkout", StatusCode::NO_CONTENT, "").is_ok());
    }

    #[test]
    fn already_exists_is_a_conflict() {
        let body = r#"{"error_code":40002,"message":"Topic 'checkout' already exists."}"#;
        let err = classify(ChannelOp::Create, "checkout", StatusCode::BAD_REQUEST, body)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ChannelConflict { op: ChannelOp::Create, code: 40002, .. }
        ));
    }

    #[test]
    fn not_found_is_a_conflict_only_for_delete() {
        let body = r#"{"error_code":40403,"message":"This server does not host this topic-partition."}"#;
        let err = classify(ChannelOp::Delete, "app-1", StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(err.is_conflict());

        let err = classify(ChannelOp::Create, "app-1", StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(matches!(err, Error::ChannelAdmin { .. }));
    }

    #[test]
    fn other_codes_and_bad_statuses_are_failures() {
        let body = r#"{"error_code":40101,"message":"Unauthorized"}"#;
        let err = classify(ChannelOp::Create, "x", StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert_eq!(err.as_message(), "error_code 40101: Unauthorized");

        let err = classify(ChannelOp::Create, "x", StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, Error::ChannelAdmin { .. }));
    }
}
