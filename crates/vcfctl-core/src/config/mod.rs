//! Configuration and profile management
//!
// Nested config module is intentional for the config subsystem
#![allow(clippy::module_inception)]
//!
//! - Named profiles, one per SDDC Manager
//! - Optional OS keyring storage for passwords
//! - `${VAR}` expansion in the config file
//! - `VCF_*` environment variables as overrides or a complete connection

pub mod config;
pub mod credential;
pub mod error;

pub use config::{
    Config, ENV_ALLOW_UNVERIFIED_TLS, ENV_HOST, ENV_PASSWORD, ENV_POLL_INTERVAL, ENV_USERNAME,
    Profile, ResolvedProfile,
};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
