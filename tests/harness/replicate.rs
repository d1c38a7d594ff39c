//! ReplicateMock - predictions API stand-in backed by wiremock

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_TOKEN: &str = "r8_test_token";
pub const MODEL_VERSION: &str = "5f24084160c9089501c1b3545d9be3c27883ae2239b6f412990e82d4a6210f8f";

pub struct ReplicateMock {
    server: MockServer,
}

impl ReplicateMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    fn poll_url(&self, id: &str) -> String {
        format!("{}/v1/predictions/{}", self.uri(), id)
    }

    /// Content served for output `index`
    pub fn output_bytes(index: usize) -> Vec<u8> {
        format!("jpeg-bytes-{}", index).into_bytes()
    }

    async fn mount_create(&self, id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("authorization", format!("Bearer {}", API_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": id,
                "status": "starting",
                "output": null,
                "urls": { "get": self.poll_url(id) }
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_poll(&self, id: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/predictions/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// A prediction that settles after one poll with `outputs` images
    pub async fn mount_success(&self, outputs: usize) {
        let id = "pred-ok";
        self.mount_create(id).await;

        let urls = self.mount_deliveries(outputs).await;
        self.mount_poll(
            id,
            json!({ "id": id, "status": "succeeded", "output": urls, "urls": { "get": self.poll_url(id) } }),
        )
        .await;
    }

    /// Serve `outputs` images and return their URLs
    async fn mount_deliveries(&self, outputs: usize) -> Vec<String> {
        let mut urls = Vec::with_capacity(outputs);
        for i in 0..outputs {
            Mock::given(method("GET"))
                .and(path(format!("/delivery/out-{}.jpg", i)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(Self::output_bytes(i)))
                .mount(&self.server)
                .await;
            urls.push(format!("{}/delivery/out-{}.jpg", self.uri(), i));
        }
        urls
    }

    /// A create call held open for `delay`, answering with a finished prediction
    pub async fn mount_slow_success(&self, outputs: usize, delay: Duration) {
        let id = "pred-slow";
        let urls = self.mount_deliveries(outputs).await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({
                        "id": id,
                        "status": "succeeded",
                        "output": urls,
                        "urls": { "get": self.poll_url(id) }
                    }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// `Prefer` headers of every prediction creation request
    pub async fn prefer_headers(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/v1/predictions")
            .filter_map(|r| r.headers.get("prefer"))
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// A prediction the model rejects
    pub async fn mount_failure(&self, reason: &str) {
        let id = "pred-failed";
        self.mount_create(id).await;
        self.mount_poll(
            id,
            json!({ "id": id, "status": "failed", "error": reason, "urls": { "get": self.poll_url(id) } }),
        )
        .await;
    }

    /// A prediction that never leaves "processing"
    pub async fn mount_stuck(&self) {
        let id = "pred-stuck";
        self.mount_create(id).await;
        self.mount_poll(
            id,
            json!({ "id": id, "status": "processing", "urls": { "get": self.poll_url(id) } }),
        )
        .await;
    }

    /// A prediction that succeeds without producing anything
    pub async fn mount_empty(&self) {
        let id = "pred-empty";
        self.mount_create(id).await;
        self.mount_poll(
            id,
            json!({ "id": id, "status": "succeeded", "output": [], "urls": { "get": self.poll_url(id) } }),
        )
        .await;
    }

    /// Reject prediction creation with `status`
    pub async fn mount_rejection(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "detail": "Invalid token.", "status": status })),
            )
            .mount(&self.server)
            .await;
    }

    /// Bodies of every prediction creation request
    pub async fn created(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/v1/predictions")
            .map(|r| r.body_json().expect("prediction body is JSON"))
            .collect()
    }
}
