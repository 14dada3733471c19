use dispatch::{DeliveryMethod, PublishOptions, Publisher};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SITE: &str = "https://notes.example.com";

async fn publisher(server: &MockServer) -> Publisher {
    Publisher::new(&server.uri(), "test_token", SITE).unwrap()
}

#[tokio::test]
async fn direct_publish_hits_publish_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/publish/{SITE}/api/notes/summarize")))
        .and(header("Authorization", "Bearer test_token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "url": "https://example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageId": "m1" })))
        .expect(1)
        .mount(&server)
        .await;

    publisher(&server)
        .await
        .publish(
            "/api/notes/summarize",
            &json!({ "url": "https://example.com" }),
            &PublishOptions::default(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn direct_publish_sets_scheduling_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/publish/{SITE}/api/summarize/daily")))
        .and(header("Upstash-Delay", "90s"))
        .and(header("Upstash-Not-Before", "1767225600"))
        .and(header("Upstash-Method", "GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let options = PublishOptions {
        delay_seconds: Some(90),
        not_before: Some(1_767_225_600),
        method: Some(DeliveryMethod::Get),
        ..PublishOptions::default()
    };
    publisher(&server)
        .await
        .publish("/api/summarize/daily", &json!({}), &options)
        .await
        .unwrap();
}

/// Matches only when no delivery-override header is present; the queue path
/// and the direct-delivery knobs are mutually exclusive.
struct NoSchedulingHeaders;

impl wiremock::Match for NoSchedulingHeaders {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("Upstash-Delay")
            && !request.headers.contains_key("Upstash-Not-Before")
            && !request.headers.contains_key("Upstash-Method")
    }
}

#[tokio::test]
async fn queue_publish_hits_enqueue_endpoint_without_scheduling_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/v2/enqueue/daily-note-queue/{SITE}/api/summarize/urls/scrape"
        )))
        .and(header("Authorization", "Bearer test_token"))
        .and(NoSchedulingHeaders)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageId": "m2" })))
        .expect(1)
        .mount(&server)
        .await;

    // Delivery overrides are ignored once a queue is assigned.
    let options = PublishOptions {
        delay_seconds: Some(30),
        method: Some(DeliveryMethod::Get),
        ..PublishOptions::queue("daily-note-queue")
    };
    publisher(&server)
        .await
        .publish(
            "/api/summarize/urls/scrape",
            &json!({ "url": "https://example.com" }),
            &options,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn queue_parallelism_upserts_queue_first() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/queues/"))
        .and(body_json(
            json!({ "queueName": "daily-note-queue", "parallelism": 2 }),
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/v2/enqueue/daily-note-queue/{SITE}/api/notes/summarize"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let options = PublishOptions {
        queue_parallelism: Some(2),
        ..PublishOptions::queue("daily-note-queue")
    };
    publisher(&server)
        .await
        .publish("/api/notes/summarize", &json!({ "n": 1 }), &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn provider_error_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = publisher(&server)
        .await
        .publish(
            "/api/notes/summarize",
            &json!({}),
            &PublishOptions::default(),
        )
        .await
        .unwrap_err();

    match err {
        errors::DigestError::DispatchFailed { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected DispatchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn oversized_payload_is_marked_compressed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(header("Content-Encoding", "gzip"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let huge = json!({ "body": "x".repeat(dispatch::MAX_UNCOMPRESSED_BYTES + 1) });
    publisher(&server)
        .await
        .publish("/api/notes/summarize", &huge, &PublishOptions::default())
        .await
        .unwrap();
}
