//! # vcfctl-core
//!
//! Client core for the SDDC Manager control plane of VMware Cloud Foundation.
//!
//! Most SDDC Manager operations (creating a domain, adding hosts, expanding a
//! cluster) return immediately with a task id and keep running server-side.
//! This crate provides the pieces a caller needs to drive them:
//!
//! - [`Session`] holds credentials and a bearer token, re-authenticating
//!   transparently once the token gets old
//! - [`SddcClient`] sends authenticated requests and classifies every answer
//!   into an [`ApiResponse`]
//! - [`TaskTracker`] polls a task to completion, logging each finished step
//!   once
//! - [`get_resource_id`] reads the id of a resource a finished task created
//! - [`config`] manages named profiles in a TOML file
//!
//! ## Example
//!
//! ```rust,ignore
//! use vcfctl_core::{Session, SddcClient, TaskTracker, get_resource_id};
//! use tokio_util::sync::CancellationToken;
//!
//! let session = Session::builder()
//!     .base_url("https://sddc-manager.example.com")
//!     .username("administrator@vsphere.local")
//!     .password(password)
//!     .connect()
//!     .await?;
//! let client = SddcClient::new(session);
//!
//! TaskTracker::new(&client, &task_id)
//!     .wait(&CancellationToken::new())
//!     .await?;
//! let cluster_id = get_resource_id(&client, &task_id, "Cluster").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod resources;
pub mod service_error;
pub mod session;
pub mod task;
pub mod tracker;

pub use client::{SddcClient, TaskSource};
pub use config::{Config, ConfigError, Profile, ResolvedProfile};
pub use error::{CoreError, Result};
pub use resources::get_resource_id;
pub use service_error::{ApiResponse, ErrorCause, ServiceError, get_error, log_error};
pub use session::{Credentials, DEFAULT_REFRESH_AFTER, Session, SessionBuilder};
pub use task::{LocalizableDescriptionPack, SubTask, Task, TaskResource, TaskStatus};
pub use tracker::{
    DEFAULT_POLL_INTERVAL, ProgressCallback, ProgressEvent, TaskTracker, TrackerState,
    wait_for_task,
};
