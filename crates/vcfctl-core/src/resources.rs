//! Resource lookup on completed tasks
//!
//! Operations that create something (a domain, a cluster, a host) list what
//! they created in the task's `resources`. A follow-up call usually needs one
//! of those ids.

use crate::client::TaskSource;
use crate::error::{CoreError, Result};
use tracing::debug;

/// Id of the first resource of `resource_type` declared by a task
///
/// Always fetches a fresh snapshot. Matching on the type is exact.
pub async fn get_resource_id<S: TaskSource + ?Sized>(
    source: &S,
    task_id: &str,
    resource_type: &str,
) -> Result<String> {
    let task = source.get_task(task_id).await?.into_result()?;

    if task.resources.is_empty() {
        return Err(CoreError::NoResources {
            task_id: task_id.to_string(),
        });
    }

    match task.resource_id(resource_type) {
        Some(id) => {
            debug!("Task {} created {} {}", task_id, resource_type, id);
            Ok(id.to_string())
        }
        None => Err(CoreError::ResourceTypeNotFound {
            task_id: task_id.to_string(),
            resource_type: resource_type.to_string(),
        }),
    }
}
