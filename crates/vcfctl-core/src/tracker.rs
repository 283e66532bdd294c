//! Task completion tracking
//!
//! A submitted operation returns a task id right away and keeps running on
//! the server, sometimes for hours. [`TaskTracker`] turns that into a single
//! awaitable call: it polls the task at a fixed interval until the status is
//! terminal, logs each newly finished step exactly once, and converts a
//! failed or cancelled task into a [`CoreError::TaskFailed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use vcfctl_core::{TaskTracker, ProgressEvent};
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! let cancel = CancellationToken::new();
//! let task = TaskTracker::new(&client, &task_id)
//!     .with_interval(Duration::from_secs(30))
//!     .with_progress(Box::new(|event| {
//!         if let ProgressEvent::Message { message, .. } = event {
//!             println!("{message}");
//!         }
//!     }))
//!     .wait(&cancel)
//!     .await?;
//! ```

use crate::client::TaskSource;
use crate::error::{CoreError, Result};
use crate::service_error::{ApiResponse, log_error};
use crate::task::{SubTask, Task, TaskStatus};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default time between task fetches (20 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Where a tracked task stands from the client's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Polling,
    Completed,
    /// Carries the failure message
    Failed(String),
}

/// Progress events emitted while waiting on a task
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Tracking has started
    Started { task_id: String },
    /// A snapshot was fetched and the task is still running
    Polling {
        task_id: String,
        status: String,
        elapsed: Duration,
    },
    /// A step description not reported before
    Message { task_id: String, message: String },
    /// Task finished in a non-failure terminal state
    Completed {
        task_id: String,
        completion_timestamp: Option<String>,
    },
    /// Task failed, fetching it did, or the wait timed out
    Failed { task_id: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive its spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Polling state machine for one task
///
/// The set of already reported messages lives as long as the tracker, so
/// each tracked task gets its own.
pub struct TaskTracker<S> {
    source: S,
    task_id: String,
    interval: Duration,
    timeout: Option<Duration>,
    on_progress: Option<ProgressCallback>,
    logged: HashSet<String>,
    state: TrackerState,
    fetches: usize,
}

impl<S: TaskSource> TaskTracker<S> {
    pub fn new(source: S, task_id: impl Into<String>) -> Self {
        Self {
            source,
            task_id: task_id.into(),
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            on_progress: None,
            logged: HashSet::new(),
            state: TrackerState::Polling,
            fetches: 0,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound on the whole wait; unbounded by default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Number of snapshots fetched so far
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    pub fn has_logged(&self, message: &str) -> bool {
        self.logged.contains(message)
    }

    /// Poll until the task is terminal or `cancel` fires
    ///
    /// Returns the final snapshot on success. Fetches are strictly
    /// sequential; the first failed fetch ends the wait. Cancelling only
    /// stops this client from watching: the task keeps running server-side.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Result<Task> {
        let start = Instant::now();
        info!("Waiting for task {}", self.task_id);
        self.emit(ProgressEvent::Started {
            task_id: self.task_id.clone(),
        });

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            if let Some(timeout) = self.timeout
                && start.elapsed() > timeout
            {
                warn!("Gave up on task {} after {:?}", self.task_id, timeout);
                let err = CoreError::TaskTimeout(timeout);
                self.fail(&err);
                return Err(err);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                response = self.source.get_task(&self.task_id) => Some(response),
            };
            let Some(response) = fetched else {
                return Err(self.cancelled());
            };
            self.fetches += 1;

            let task = match response {
                Ok(ApiResponse::Ok(task)) => task,
                Ok(ApiResponse::ApiError { status, error }) => {
                    log_error(&error);
                    let err = CoreError::Api { status, error };
                    self.fail(&err);
                    return Err(err);
                }
                Ok(ApiResponse::Unparseable { status, .. }) => {
                    // Neither a task nor an error: undecidable, so poll again
                    warn!(
                        "Could not parse snapshot of task {} (HTTP {}), polling again",
                        self.task_id, status
                    );
                    self.pause(cancel).await?;
                    continue;
                }
                Err(err) => {
                    self.fail(&err);
                    return Err(err);
                }
            };

            if task.status().is_active() {
                self.emit(ProgressEvent::Polling {
                    task_id: self.task_id.clone(),
                    status: task.status.clone(),
                    elapsed: start.elapsed(),
                });
            }

            if matches!(self.evaluate(&task)?, TrackerState::Completed) {
                return Ok(task);
            }
            self.pause(cancel).await?;
        }
    }

    async fn pause(&mut self, cancel: &CancellationToken) -> Result<()> {
        let interval = self.interval;
        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(interval) => false,
        };
        if cancelled {
            Err(self.cancelled())
        } else {
            Ok(())
        }
    }

    fn cancelled(&self) -> CoreError {
        warn!(
            "Stopped waiting for task {}; it may still be running on the server",
            self.task_id
        );
        CoreError::WaitCancelled {
            task_id: self.task_id.clone(),
        }
    }

    fn fail(&mut self, err: &CoreError) {
        error!("Task {} failed: {}", self.task_id, err);
        self.state = TrackerState::Failed(err.to_string());
        self.emit(ProgressEvent::Failed {
            task_id: self.task_id.clone(),
            error: err.to_string(),
        });
    }
}

impl<S> TaskTracker<S> {
    /// Evaluate one snapshot: report new messages, then transition
    ///
    /// Returns `Err(CoreError::TaskFailed)` when the task is `Failed` or
    /// `Cancelled`. Any status outside the running and failure sets counts as
    /// success, since the server's vocabulary is open-ended.
    pub fn evaluate(&mut self, task: &Task) -> Result<&TrackerState> {
        self.log_new_messages(task);

        let status = task.status();
        if status.is_active() {
            debug!("Task {} is {}", self.task_id, task.status);
            self.state = TrackerState::Polling;
            return Ok(&self.state);
        }

        if status.is_failure() {
            for err in &task.errors {
                log_error(err);
            }
            let err = CoreError::TaskFailed {
                task_id: self.task_id.clone(),
                name: task.name.clone(),
                task_type: task.task_type.clone(),
                status: task.status.clone(),
                detail: task.first_failure(),
            };
            error!("{}", err);
            self.state = TrackerState::Failed(err.to_string());
            self.emit(ProgressEvent::Failed {
                task_id: self.task_id.clone(),
                error: err.to_string(),
            });
            return Err(err);
        }

        info!(
            "Task {} ({}) finished with status {} at {}",
            self.task_id,
            task.name,
            task.status,
            task.completion_timestamp.as_deref().unwrap_or("unknown time")
        );
        self.state = TrackerState::Completed;
        self.emit(ProgressEvent::Completed {
            task_id: self.task_id.clone(),
            completion_timestamp: task.completion_timestamp.clone(),
        });
        Ok(&self.state)
    }

    /// Without subtasks the task's own description is the candidate; with
    /// subtasks, every settled subtask's description is. Keyed by exact text.
    fn log_new_messages(&mut self, task: &Task) {
        let mut candidates = Vec::new();
        if task.sub_tasks.is_empty() {
            candidates.extend(task.description());
        } else {
            collect_settled(&task.sub_tasks, &mut candidates);
        }

        for message in candidates {
            if self.logged.insert(message.to_string()) {
                info!("Task {}: {}", self.task_id, message);
                self.emit(ProgressEvent::Message {
                    task_id: self.task_id.clone(),
                    message: message.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(cb) = &self.on_progress {
            cb(event);
        }
    }
}

fn collect_settled<'a>(sub_tasks: &'a [SubTask], out: &mut Vec<&'a str>) {
    for sub in sub_tasks {
        let settled = !matches!(
            sub.status(),
            TaskStatus::InProgress | TaskStatus::Pending | TaskStatus::NotApplicable
        );
        if settled {
            out.extend(sub.description());
        }
        collect_settled(&sub.sub_tasks, out);
    }
}

/// Wait for a task with the given polling interval and no timeout
pub async fn wait_for_task<S: TaskSource>(
    source: S,
    task_id: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<Task> {
    TaskTracker::new(source, task_id)
        .with_interval(interval)
        .wait(cancel)
        .await
}
