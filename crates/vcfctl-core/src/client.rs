//! REST client for the SDDC Manager API
//!
//! Thin layer over [`Session`]: every request is prepared by the session and
//! every response is classified into an [`ApiResponse`].

use crate::error::Result;
use crate::service_error::{ApiResponse, get_error};
use crate::session::Session;
use crate::task::Task;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, trace};

/// Anything that can produce task snapshots
///
/// The tracker and the resource lookup are generic over this so they can run
/// against a scripted source in tests.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// One read of the task's current state
    async fn get_task(&self, task_id: &str) -> Result<ApiResponse<Task>>;
}

#[async_trait]
impl<S: TaskSource + ?Sized> TaskSource for Arc<S> {
    async fn get_task(&self, task_id: &str) -> Result<ApiResponse<Task>> {
        (**self).get_task(task_id).await
    }
}

#[async_trait]
impl<S: TaskSource + ?Sized> TaskSource for &S {
    async fn get_task(&self, task_id: &str) -> Result<ApiResponse<Task>> {
        (**self).get_task(task_id).await
    }
}

/// Authenticated client for one SDDC Manager
#[derive(Debug, Clone)]
pub struct SddcClient {
    session: Arc<Session>,
}

impl SddcClient {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// Share a session with other clients
    pub fn from_shared(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Send one authenticated request and classify the answer
    ///
    /// `Err` means the request never got an answer (or the session could not
    /// authenticate); anything the service said comes back as `Ok`.
    pub async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        let (status, text) = self.send(method, path, body).await?;
        Ok(classify(status, text))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(StatusCode, String)> {
        let url = self.session.endpoint(path)?;
        debug!("{} {}", method, url);

        let mut request = self.session.http().request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self.session.prepare_request(request).await?;

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("Response {}: {} bytes", status, text.len());

        Ok((status, text))
    }

    /// Fetch one snapshot of a task
    pub async fn get_task(&self, task_id: &str) -> Result<ApiResponse<Task>> {
        let (status, text) = self
            .send::<()>(Method::GET, &format!("v1/tasks/{task_id}"), None)
            .await?;
        Ok(classify_task(status, text))
    }
}

#[async_trait]
impl TaskSource for SddcClient {
    async fn get_task(&self, task_id: &str) -> Result<ApiResponse<Task>> {
        SddcClient::get_task(self, task_id).await
    }
}

fn classify<T: DeserializeOwned>(status: StatusCode, body: String) -> ApiResponse<T> {
    if !status.is_success() {
        return match get_error(&body) {
            Some(error) => ApiResponse::ApiError { status, error },
            None => ApiResponse::Unparseable { status, body },
        };
    }

    // Empty 2xx bodies read as JSON null so `Value` and `()` callers succeed
    let parsed = if body.trim().is_empty() {
        serde_json::from_str("null")
    } else {
        serde_json::from_str(&body)
    };
    match parsed {
        Ok(value) => ApiResponse::Ok(value),
        Err(_) => ApiResponse::Unparseable { status, body },
    }
}

/// Like [`classify`], but a snapshot with a blank status is undecidable
pub(crate) fn classify_task(status: StatusCode, body: String) -> ApiResponse<Task> {
    match classify::<Task>(status, body.clone()) {
        ApiResponse::Ok(task) if task.status.trim().is_empty() => {
            ApiResponse::Unparseable { status, body }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_classify_success() {
        let response: ApiResponse<Task> = classify(
            StatusCode::OK,
            json!({"id": "t-1", "status": "Pending"}).to_string(),
        );
        assert_eq!(response.ok().map(|t| t.id), Some("t-1".to_string()));
    }

    #[test]
    fn test_classify_error_document() {
        let response: ApiResponse<Task> = classify(
            StatusCode::NOT_FOUND,
            json!({"errorCode": "TASK_NOT_FOUND", "message": "Task t-1 not found"}).to_string(),
        );
        match response {
            ApiResponse::ApiError { status, error } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(error.message.as_deref(), Some("Task t-1 not found"));
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unparseable() {
        let failure: ApiResponse<Task> =
            classify(StatusCode::BAD_GATEWAY, "<html>502</html>".to_string());
        assert!(matches!(failure, ApiResponse::Unparseable { .. }));

        let wrong_shape: ApiResponse<Task> =
            classify(StatusCode::OK, json!({"id": 7}).to_string());
        assert!(matches!(wrong_shape, ApiResponse::Unparseable { .. }));
    }

    #[test]
    fn test_classify_task_without_status_is_unparseable() {
        for body in [
            json!({}),
            json!({"message": "upstream proxy ok"}),
            json!({"id": "t-1", "status": "  "}),
            json!({"id": "t-1", "status": null}),
        ] {
            let response = classify_task(StatusCode::OK, body.to_string());
            assert!(
                matches!(response, ApiResponse::Unparseable { status, .. } if status == StatusCode::OK),
                "{body} should be unparseable, got {response:?}"
            );
        }

        let snapshot = classify_task(
            StatusCode::OK,
            json!({"id": "t-1", "status": "SUCCESSFUL"}).to_string(),
        );
        assert_eq!(snapshot.ok().map(|t| t.status), Some("SUCCESSFUL".to_string()));
    }

    #[test]
    fn test_classify_empty_success_body() {
        let response: ApiResponse<Value> = classify(StatusCode::NO_CONTENT, String::new());
        assert_eq!(response, ApiResponse::Ok(Value::Null));
    }
}
