//! Structured errors reported by the SDDC Manager API
//!
//! Every non-2xx response from the service carries an error document that may
//! nest further errors. This module models that document, walks it, and
//! defines [`ApiResponse`], the three-way outcome of a single API call.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

/// Error document returned by the service for non-success responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<ErrorCause>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_errors: Vec<ServiceError>,
    /// Correlation token to quote when contacting support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_message: Option<String>,
}

/// One entry of [`ServiceError::causes`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorCause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub cause_type: Option<String>,
}

impl ServiceError {
    /// Parse a raw response body into an error document.
    ///
    /// Returns `None` when the body is not a JSON object of this shape, or
    /// when it parses but carries none of the fields that identify an error
    /// document. Callers use `None` to tell "unparseable" apart from a
    /// well-formed API error.
    pub fn from_body(body: &str) -> Option<Self> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        parsed.is_recognizable().then_some(parsed)
    }

    fn is_recognizable(&self) -> bool {
        self.message.is_some()
            || self.error_code.is_some()
            || self.error_type.is_some()
            || self.reference_token.is_some()
            || self.remediation_message.is_some()
            || !self.nested_errors.is_empty()
    }

    /// All present messages, top-level first, then nested errors depth-first
    pub fn messages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(message) = self.message.as_deref() {
            out.push(message);
        }
        for nested in &self.nested_errors {
            nested.collect_messages(out);
        }
    }

    /// The message to show a user: the top-level message, else the first
    /// nested one, else the error code.
    pub fn summary(&self) -> String {
        self.messages()
            .first()
            .map(|m| (*m).to_string())
            .or_else(|| self.error_code.clone())
            .unwrap_or_else(|| "unknown service error".to_string())
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())?;
        if let Some(remediation) = &self.remediation_message {
            write!(f, " (remediation: {remediation})")?;
        }
        if let Some(token) = &self.reference_token {
            write!(f, " [reference token: {token}]")?;
        }
        Ok(())
    }
}

/// Parse a raw body into a [`ServiceError`]; see [`ServiceError::from_body`]
pub fn get_error(body: &str) -> Option<ServiceError> {
    ServiceError::from_body(body)
}

/// Log every message of an error tree at error level, in pre-order
pub fn log_error(err: &ServiceError) {
    for message in err.messages() {
        error!("{}", message);
    }
}

/// Outcome of one API call that reached the service
///
/// Transport failures are reported separately through `CoreError`; this type
/// only distinguishes what the service answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    /// 2xx with a body of the expected shape
    Ok(T),
    /// Non-2xx with a well-formed error document
    ApiError {
        status: StatusCode,
        error: ServiceError,
    },
    /// A body that matched neither the expected shape nor an error document
    Unparseable { status: StatusCode, body: String },
}

impl<T> ApiResponse<T> {
    /// Collapse into a `Result`, treating an unparseable body as an error
    pub fn into_result(self) -> crate::Result<T> {
        match self {
            ApiResponse::Ok(value) => Ok(value),
            ApiResponse::ApiError { status, error } => {
                Err(crate::CoreError::Api { status, error })
            }
            ApiResponse::Unparseable { status, body } => {
                Err(crate::CoreError::UnexpectedResponse { status, body })
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResponse::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Ok(value) => ApiResponse::Ok(f(value)),
            ApiResponse::ApiError { status, error } => ApiResponse::ApiError { status, error },
            ApiResponse::Unparseable { status, body } => ApiResponse::Unparseable { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(message: &str) -> ServiceError {
        ServiceError {
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full_error_document() {
        let body = json!({
            "arguments": ["sfo-m01"],
            "causes": [{"message": "host unreachable", "type": "java.net.ConnectException"}],
            "context": {"domain": "sfo-m01"},
            "errorCode": "DOMAIN_CREATE_FAILED",
            "errorType": "SERVER_ERROR",
            "message": "Failed to create domain",
            "nestedErrors": [{"message": "Validation failed"}],
            "referenceToken": "ABC123",
            "remediationMessage": "Check host connectivity"
        })
        .to_string();

        let err = get_error(&body).unwrap();
        assert_eq!(err.error_code.as_deref(), Some("DOMAIN_CREATE_FAILED"));
        assert_eq!(err.causes[0].cause_type.as_deref(), Some("java.net.ConnectException"));
        assert_eq!(err.context.get("domain").map(String::as_str), Some("sfo-m01"));
        assert_eq!(err.nested_errors.len(), 1);
        assert_eq!(err.reference_token.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_messages_are_pre_order() {
        let err = ServiceError {
            message: Some("top".to_string()),
            nested_errors: vec![
                ServiceError {
                    message: Some("child 1".to_string()),
                    nested_errors: vec![leaf("grandchild")],
                    ..Default::default()
                },
                leaf("child 2"),
            ],
            ..Default::default()
        };

        assert_eq!(err.messages(), vec!["top", "child 1", "grandchild", "child 2"]);
    }

    #[test]
    fn test_messages_skip_absent() {
        let err = ServiceError {
            error_code: Some("E1".to_string()),
            nested_errors: vec![ServiceError::default(), leaf("only nested")],
            ..Default::default()
        };

        assert_eq!(err.messages(), vec!["only nested"]);
        assert_eq!(err.summary(), "only nested");
    }

    #[test]
    fn test_serialize_round_trip_keeps_order() {
        let err = ServiceError {
            message: Some("top".to_string()),
            nested_errors: vec![leaf("child 1"), leaf("child 2")],
            ..Default::default()
        };

        let body = serde_json::to_string(&err).unwrap();
        let parsed = get_error(&body).unwrap();
        assert_eq!(parsed.messages(), vec!["top", "child 1", "child 2"]);
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_unparseable_bodies_yield_none() {
        assert!(get_error("<html>Bad Gateway</html>").is_none());
        assert!(get_error("").is_none());
        assert!(get_error("[1, 2, 3]").is_none());
        assert!(get_error(r#"{"message": 42}"#).is_none());
        // A JSON object with no error fields is not an error document
        assert!(get_error(r#"{"id": "t-1", "status": "Failed"}"#).is_none());
    }

    #[test]
    fn test_summary_falls_back_to_code() {
        let err = ServiceError {
            error_code: Some("VCF_E_401".to_string()),
            ..Default::default()
        };
        assert_eq!(err.summary(), "VCF_E_401");
        assert_eq!(ServiceError::default().summary(), "unknown service error");
    }

    #[test]
    fn test_display_includes_remediation_and_token() {
        let err = ServiceError {
            message: Some("Bring-up failed".to_string()),
            remediation_message: Some("Retry the task".to_string()),
            reference_token: Some("XYZ".to_string()),
            ..Default::default()
        };
        let text = err.to_string();
        assert!(text.starts_with("Bring-up failed"));
        assert!(text.contains("Retry the task"));
        assert!(text.contains("XYZ"));
    }

    #[test]
    fn test_api_response_into_result() {
        let ok: ApiResponse<u32> = ApiResponse::Ok(7);
        assert_eq!(ok.into_result().unwrap(), 7);

        let api: ApiResponse<u32> = ApiResponse::ApiError {
            status: StatusCode::BAD_REQUEST,
            error: leaf("bad payload"),
        };
        let err = api.into_result().unwrap_err();
        assert!(err.to_string().contains("bad payload"));

        let garbage: ApiResponse<u32> = ApiResponse::Unparseable {
            status: StatusCode::BAD_GATEWAY,
            body: "oops".to_string(),
        };
        assert!(garbage.into_result().is_err());
    }
}
