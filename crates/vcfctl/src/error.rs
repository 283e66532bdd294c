//! Error types for vcfctl

use colored::Colorize;
use thiserror::Error;
use vcfctl_core::{ConfigError, CoreError};

/// Main error type for the vcfctl application
#[derive(Error, Debug)]
pub enum VcfCtlError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for vcfctl operations
pub type Result<T> = std::result::Result<T, VcfCtlError>;

impl VcfCtlError {
    /// Process exit code: 130 for an interrupted wait, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            VcfCtlError::Core(e) if e.is_cancelled() => 130,
            _ => 1,
        }
    }

    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            VcfCtlError::Config(ConfigError::ProfileNotFound { name }) => vec![
                "List available profiles: vcfctl profile list".to_string(),
                format!(
                    "Create profile '{name}': vcfctl profile set {name} --host <host> --username <user>"
                ),
            ],
            VcfCtlError::Config(ConfigError::NoProfiles { .. }) => vec![
                "View profile documentation: vcfctl profile --help".to_string(),
            ],
            VcfCtlError::Core(e) if e.is_unauthorized() => vec![
                "Check the username and password: vcfctl profile show <profile>".to_string(),
            ],
            VcfCtlError::Core(e) if e.is_transport() => {
                let text = e.to_string();
                let mut tips = vec!["Check that the SDDC Manager host is reachable".to_string()];
                if text.contains("certificate") || text.contains("TLS") {
                    tips.push(
                        "For lab appliances with self-signed certificates, set --allow-unverified-tls on the profile"
                            .to_string(),
                    );
                }
                tips
            }
            VcfCtlError::Core(CoreError::WaitCancelled { task_id }) => vec![format!(
                "The task keeps running; resume with: vcfctl task wait {task_id}"
            )],
            VcfCtlError::Core(CoreError::TaskTimeout(_)) => vec![
                "The task may still be running; check it with: vcfctl task get <task-id>"
                    .to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a diagnostic to stderr
    pub fn print_diagnostic(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{self}");

        for suggestion in self.suggestions() {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{suggestion}");
        }
    }
}
