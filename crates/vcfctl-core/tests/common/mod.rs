//! Wiremock-backed SDDC Manager for integration tests

#![allow(dead_code)]

use serde_json::{Value, json};
use std::time::Duration;
use vcfctl_core::{SddcClient, Session};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "administrator@vsphere.local";
pub const PASSWORD: &str = "VMware1!VMware1!";

pub struct MockSddcServer {
    pub server: MockServer,
}

impl MockSddcServer {
    /// Start a server that hands out `token-1` to every token request
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "token-1",
                "refreshToken": {"id": "refresh-1"}
            })))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn session_builder(&self) -> vcfctl_core::SessionBuilder {
        Session::builder()
            .base_url(self.uri())
            .username(USERNAME)
            .password(PASSWORD)
            .timeout(Duration::from_secs(5))
    }

    pub async fn client(&self) -> SddcClient {
        SddcClient::new(self.session_builder().connect().await.unwrap())
    }

    /// Serve `snapshots` in order, one per fetch; the last one repeats
    pub async fn mount_task_sequence(&self, task_id: &str, snapshots: Vec<ResponseTemplate>) {
        let count = snapshots.len();
        for (i, response) in snapshots.into_iter().enumerate() {
            let mock = Mock::given(method("GET"))
                .and(path(format!("/v1/tasks/{task_id}")))
                .and(header_exists("authorization"))
                .respond_with(response);
            let mock = if i + 1 < count {
                mock.up_to_n_times(1)
            } else {
                mock
            };
            mock.mount(&self.server).await;
        }
    }

    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    pub async fn task_fetches(&self, task_id: &str) -> usize {
        self.requests_to(&format!("/v1/tasks/{task_id}")).await
    }

    pub async fn token_requests(&self) -> usize {
        self.requests_to("/v1/tokens").await
    }
}

/// Task snapshot body
pub struct TaskFixture {
    body: Value,
}

impl TaskFixture {
    pub fn new(id: &str, status: &str) -> Self {
        Self {
            body: json!({
                "id": id,
                "name": "Add cluster sfo-m01-cl02",
                "type": "CLUSTER_CREATE",
                "status": status,
                "creationTimestamp": "2024-01-01T00:00:00.000Z"
            }),
        }
    }

    pub fn completed_at(mut self, timestamp: &str) -> Self {
        self.body["completionTimestamp"] = json!(timestamp);
        self
    }

    pub fn resource(mut self, resource_type: &str, resource_id: &str) -> Self {
        let entry = json!({"resourceId": resource_id, "type": resource_type});
        match self.body["resources"].as_array_mut() {
            Some(resources) => resources.push(entry),
            None => self.body["resources"] = json!([entry]),
        }
        self
    }

    pub fn sub_task(mut self, status: &str, description: &str) -> Self {
        let entry = json!({"name": description, "description": description, "status": status});
        match self.body["subTasks"].as_array_mut() {
            Some(sub_tasks) => sub_tasks.push(entry),
            None => self.body["subTasks"] = json!([entry]),
        }
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.body["errors"] = json!([{"errorCode": "TASK_FAILED", "message": message}]);
        self
    }

    pub fn response(self) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(self.body)
    }
}

pub fn service_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "errorCode": code,
        "message": message,
        "referenceToken": "REF123"
    }))
}
