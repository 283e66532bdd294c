//! Unified error handling for vcfctl-core
//!
//! Separates the failure families a caller may want to react to differently:
//! transport problems, well-formed service errors, bodies nobody could parse,
//! and tasks that ran to a failed terminal state.
//!
//! # Example
//!
//! ```rust
//! use vcfctl_core::CoreError;
//!
//! fn should_resubmit(err: &CoreError) -> bool {
//!     // A failed task may succeed when submitted again; a bad request won't
//!     err.is_task_failure() || err.is_retryable()
//! }
//!
//! let err = CoreError::TaskFailed {
//!     task_id: "t-1".to_string(),
//!     name: "Create cluster".to_string(),
//!     task_type: "CLUSTER_CREATE".to_string(),
//!     status: "Failed".to_string(),
//!     detail: None,
//! };
//! assert!(should_resubmit(&err));
//! ```

use crate::config::ConfigError;
use crate::service_error::ServiceError;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Core error type for session, client and task operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// The HTTP call itself failed (DNS, connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Non-2xx response with a well-formed error document
    #[error("API error ({status}): {error}")]
    Api {
        status: StatusCode,
        error: ServiceError,
    },

    /// A body that matched no expected shape
    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: StatusCode, body: String },

    /// Task reached `Failed` or `Cancelled`
    #[error(
        "Task with ID {task_id}, name {name:?}, type {task_type:?} is in state {status}{}",
        .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    TaskFailed {
        task_id: String,
        name: String,
        task_type: String,
        status: String,
        detail: Option<String>,
    },

    #[error("Task {task_id} did not contain any resources")]
    NoResources { task_id: String },

    #[error("Task {task_id} did not contain resources of type {resource_type}")]
    ResourceTypeNotFound {
        task_id: String,
        resource_type: String,
    },

    /// Task timed out waiting for completion
    #[error("Task timed out after {0:?}")]
    TaskTimeout(Duration),

    /// The caller stopped waiting; the task itself keeps running server-side
    #[error("Stopped waiting for task {task_id}: cancelled")]
    WaitCancelled { task_id: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    fn status(&self) -> Option<StatusCode> {
        match self {
            CoreError::Api { status, .. } | CoreError::UnexpectedResponse { status, .. } => {
                Some(*status)
            }
            CoreError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The service error document, if this error carries one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            CoreError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns true if a task ran to `Failed` or `Cancelled`
    #[must_use]
    pub fn is_task_failure(&self) -> bool {
        matches!(self, CoreError::TaskFailed { .. })
    }

    /// Returns true if the HTTP call never produced a response
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Transport(e) if e.status().is_none())
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_server_error())
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_timeout(),
            CoreError::TaskTimeout(_) => true,
            _ => false,
        }
    }

    /// Returns true if the caller cancelled the wait
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::WaitCancelled { .. })
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_transport()
            || self.is_server_error()
            || self.is_timeout()
            || self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: StatusCode) -> CoreError {
        CoreError::Api {
            status,
            error: ServiceError {
                message: Some("boom".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_task_failed_message_names_the_task() {
        let err = CoreError::TaskFailed {
            task_id: "t-42".to_string(),
            name: "Add cluster".to_string(),
            task_type: "CLUSTER_CREATE".to_string(),
            status: "Cancelled".to_string(),
            detail: None,
        };
        let text = err.to_string();
        assert!(text.contains("t-42"));
        assert!(text.contains("Add cluster"));
        assert!(text.contains("CLUSTER_CREATE"));
        assert!(text.contains("Cancelled"));
        assert!(err.is_task_failure());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_task_failed_message_appends_detail() {
        let err = CoreError::TaskFailed {
            task_id: "t-1".to_string(),
            name: "n".to_string(),
            task_type: "t".to_string(),
            status: "Failed".to_string(),
            detail: Some("Host validation failed".to_string()),
        };
        assert!(err.to_string().ends_with(": Host validation failed"));
    }

    #[test]
    fn test_status_helpers() {
        assert!(api_error(StatusCode::NOT_FOUND).is_not_found());
        assert!(api_error(StatusCode::UNAUTHORIZED).is_unauthorized());
        assert!(api_error(StatusCode::FORBIDDEN).is_unauthorized());
        assert!(api_error(StatusCode::SERVICE_UNAVAILABLE).is_server_error());
        assert!(api_error(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(api_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!api_error(StatusCode::BAD_REQUEST).is_retryable());
    }

    #[test]
    fn test_api_error_display_uses_service_message() {
        let err = api_error(StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("boom"));
        assert_eq!(err.service_error().and_then(|e| e.message.as_deref()), Some("boom"));
    }

    #[test]
    fn test_timeout_and_cancel() {
        let timeout = CoreError::TaskTimeout(Duration::from_secs(60));
        assert!(timeout.is_timeout());
        assert!(timeout.to_string().contains("timed out"));

        let cancelled = CoreError::WaitCancelled {
            task_id: "t-9".to_string(),
        };
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_task_failure());
    }
}
