use logvisor::{AdminConfig, AuthScheme, ChannelOp, ChannelProvisioner, Error, HttpChannelProvisioner};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provisioner(server: &MockServer, scheme: AuthScheme) -> HttpChannelProvisioner {
    let cfg = AdminConfig {
        url: server.uri(),
        api_key: SecretString::from("s3cr3t".to_string()),
        scheme,
        ..AdminConfig::default()
    };
    HttpChannelProvisioner::new(&cfg).unwrap()
}

#[tokio::test]
async fn create_posts_topic_definition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics"))
        .and(header("authorization", "Basic s3cr3t"))
        .and(body_json(json!({
            "topic_name": "checkout",
            "partitions_count": 1,
            "replication_factor": 3
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "kind": "KafkaTopic",
            "topic_name": "checkout"
        })))
        .expect(1)
        .mount(&server)
        .await;

    provisioner(&server, AuthScheme::Basic)
        .create("checkout")
        .await
        .unwrap();
}

#[tokio::test]
async fn second_create_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"topic_name": "checkout"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": 40002,
            "message": "Topic 'checkout' already exists."
        })))
        .mount(&server)
        .await;

    let admin = provisioner(&server, AuthScheme::Basic);
    admin.create("checkout").await.unwrap();
    let err = admin.create("checkout").await.unwrap_err();
    assert!(matches!(
        err,
        Error::ChannelConflict { op: ChannelOp::Create, code: 40002, .. }
    ));
}

#[tokio::test]
async fn other_error_codes_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_code": 40101,
            "message": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = provisioner(&server, AuthScheme::Basic)
        .create("checkout")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChannelAdmin { op: ChannelOp::Create, .. }));
    assert_eq!(err.as_label(), "channel_admin");
}

#[tokio::test]
async fn delete_targets_the_named_topic() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/topics/app-1"))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provisioner(&server, AuthScheme::Bearer)
        .delete("app-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn deleting_a_missing_topic_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/topics/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": 40403,
            "message": "This server does not host this topic-partition."
        })))
        .mount(&server)
        .await;

    let err = provisioner(&server, AuthScheme::Basic)
        .delete("gone")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn empty_name_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = provisioner(&server, AuthScheme::Basic)
        .delete("")
        .await
        .unwrap_err();
    assert_eq!(err.as_message(), "channel name is required");
}

#[tokio::test]
async fn unreachable_server_is_an_admin_failure() {
    let cfg = AdminConfig {
        url: "http://127.0.0.1:1".to_string(),
        ..AdminConfig::default()
    };
    let err = HttpChannelProvisioner::new(&cfg)
        .unwrap()
        .create("checkout")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChannelAdmin { .. }));
}
