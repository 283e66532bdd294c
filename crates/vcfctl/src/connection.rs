//! Connection management for SDDC Manager clients

use crate::error::Result as CliResult;
use anyhow::Context;
use std::path::PathBuf;
use tracing::{debug, info, trace};
use vcfctl_core::{Config, ResolvedProfile, SddcClient};

/// Connection manager for creating authenticated clients
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the file it was loaded from
    pub fn save_config(&self) -> CliResult<()> {
        match &self.config_path {
            Some(path) => self
                .config
                .save_to_path(path)
                .context("Failed to save configuration")?,
            None => self.config.save().context("Failed to save configuration")?,
        }
        Ok(())
    }

    /// Resolve connection settings from the environment or a profile
    ///
    /// When --config-file is explicitly specified, environment variables are
    /// ignored so the file alone decides where to connect.
    pub fn resolve(&self, profile_name: Option<&str>) -> CliResult<ResolvedProfile> {
        trace!("Profile name: {:?}", profile_name);
        let use_env_vars = self.config_path.is_none();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        if use_env_vars
            && profile_name.is_none()
            && let Some(resolved) = ResolvedProfile::from_env()?
        {
            info!("Using SDDC Manager connection from environment variables");
            return Ok(resolved);
        }

        let name = self.config.resolve_profile(profile_name)?;
        info!("Using profile: {}", name);
        let mut resolved = self
            .config
            .get_profile(&name)?
            .resolve_credentials(use_env_vars)?;

        if resolved.password.is_none() {
            debug!("Profile '{}' has no stored password, prompting", name);
            let password =
                rpassword::prompt_password(format!("Password for {}: ", resolved.username))
                    .context("Failed to read password")?;
            resolved.password = Some(password);
        }

        Ok(resolved)
    }

    /// Authenticate and return a client along with the settings used
    pub async fn create_client(
        &self,
        profile_name: Option<&str>,
    ) -> CliResult<(SddcClient, ResolvedProfile)> {
        let resolved = self.resolve(profile_name)?;
        info!("Connecting to SDDC Manager: {}", resolved.base_url);

        let session = resolved.session_builder()?.connect().await?;
        debug!("Authenticated as {}", session.username());

        Ok((SddcClient::new(session), resolved))
    }
}
