//! Task snapshots as reported by `GET /v1/tasks/{id}`
//!
//! The client only ever reads these. Every field except `status` is optional
//! on the wire.

use crate::service_error::ServiceError;
use serde::{Deserialize, Serialize};

/// Snapshot of one server-tracked asynchronous operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub task_type: String,
    /// Required on the wire; a body without it is not a snapshot
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    /// Present only once the task is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServiceError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizable_description_pack: Option<LocalizableDescriptionPack>,
}

/// A unit of work nested inside a [`Task`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServiceError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizable_description_pack: Option<LocalizableDescriptionPack>,
}

/// A resource the task declares as its output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResource {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Localized, human-readable description of a task or step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizableDescriptionPack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

/// Classification of the open-ended status vocabulary
///
/// Parsing ignores case and treats spaces and underscores alike, so
/// `"In Progress"` and `"IN_PROGRESS"` are the same state. Anything not
/// explicitly known lands in `Other`, which callers treat as terminal success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Pending,
    NotApplicable,
    Failed,
    Cancelled,
    Other(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "IN_PROGRESS" => TaskStatus::InProgress,
            "PENDING" => TaskStatus::Pending,
            "NOT_APPLICABLE" => TaskStatus::NotApplicable,
            "FAILED" => TaskStatus::Failed,
            "CANCELLED" => TaskStatus::Cancelled,
            _ => TaskStatus::Other(raw.to_string()),
        }
    }

    /// Still running; the tracker keeps polling
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Pending)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::parse(&self.status)
    }

    pub fn description(&self) -> Option<&str> {
        self.localizable_description_pack
            .as_ref()
            .and_then(|p| p.message.as_deref())
    }

    /// Identifier of the first declared resource of `resource_type`
    pub fn resource_id(&self, resource_type: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
            .map(|r| r.resource_id.as_str())
    }

    /// First failure message anywhere in the task tree
    ///
    /// Task-level errors win; otherwise subtasks are searched depth-first for
    /// one in a failed state, using its errors, then its description.
    pub fn first_failure(&self) -> Option<String> {
        self.errors
            .first()
            .map(ServiceError::summary)
            .or_else(|| self.sub_tasks.iter().find_map(SubTask::first_failure))
    }
}

impl SubTask {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::parse(&self.status)
    }

    /// Prefer the localized message, falling back to the plain description
    pub fn description(&self) -> Option<&str> {
        self.localizable_description_pack
            .as_ref()
            .and_then(|p| p.message.as_deref())
            .or(self.description.as_deref())
    }

    fn first_failure(&self) -> Option<String> {
        if self.status().is_failure() {
            let own = self
                .errors
                .first()
                .map(ServiceError::summary)
                .or_else(|| self.description().map(str::to_string))
                .unwrap_or_else(|| format!("subtask {:?} is {}", self.name, self.status));
            return Some(own);
        }
        self.sub_tasks.iter().find_map(SubTask::first_failure)
    }
}
