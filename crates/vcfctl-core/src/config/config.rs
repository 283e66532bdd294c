//! Profile configuration for SDDC Manager endpoints
//!
//! Stored as TOML with one named profile per appliance:
//!
//! ```toml
//! default_profile = "lab"
//!
//! [profiles.lab]
//! host = "sddc-manager.lab.example.com"
//! username = "administrator@vsphere.local"
//! password = "${VCF_LAB_PASSWORD}"
//! allow_unverified_tls = true
//! poll_interval_secs = 10
//! ```

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use crate::session::{DEFAULT_REFRESH_AFTER, SessionBuilder};
use crate::tracker::DEFAULT_POLL_INTERVAL;

pub const ENV_HOST: &str = "VCF_SDDC_MANAGER_HOST";
pub const ENV_USERNAME: &str = "VCF_SDDC_MANAGER_USERNAME";
pub const ENV_PASSWORD: &str = "VCF_SDDC_MANAGER_PASSWORD";
pub const ENV_ALLOW_UNVERIFIED_TLS: &str = "VCF_ALLOW_UNVERIFIED_TLS";
pub const ENV_POLL_INTERVAL: &str = "VCF_POLL_INTERVAL";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// One SDDC Manager endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Hostname, or a full `https://` URL
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub username: String,
    /// Plaintext or `keyring:` reference; prompted for when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub allow_unverified_tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_after_secs: Option<u64>,
}

/// Connection settings with every reference resolved
#[derive(Clone, PartialEq)]
pub struct ResolvedProfile {
    pub base_url: String,
    pub username: String,
    pub password: Option<String>,
    pub allow_unverified_tls: bool,
    pub poll_interval: Duration,
    pub refresh_after: Duration,
}

impl std::fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("allow_unverified_tls", &self.allow_unverified_tls)
            .field("poll_interval", &self.poll_interval)
            .field("refresh_after", &self.refresh_after)
            .finish()
    }
}

impl Profile {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: username.into(),
            password: None,
            allow_unverified_tls: false,
            poll_interval_secs: None,
            refresh_after_secs: None,
        }
    }

    pub fn base_url(&self) -> String {
        build_base_url(&self.host, self.port)
    }

    /// Configured interval, or the default when unset or zero
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn refresh_after(&self) -> Duration {
        self.refresh_after_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REFRESH_AFTER)
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Resolve keyring references and, when `use_env` is set, apply
    /// `VCF_*` environment overrides field by field
    pub fn resolve_credentials(&self, use_env: bool) -> Result<ResolvedProfile> {
        let store = CredentialStore::new();
        let env = |var: &'static str| use_env.then_some(var);

        let host = store
            .get_credential(&self.host, env(ENV_HOST))
            .map_err(|e| ConfigError::CredentialError(format!("Failed to resolve host: {e}")))?;
        let username = store
            .get_credential(&self.username, env(ENV_USERNAME))
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve username: {e}"))
            })?;
        let password = match (&self.password, env_value(env(ENV_PASSWORD))) {
            (_, Some(from_env)) => Some(from_env),
            (Some(stored), None) => Some(store.get_credential(stored, None).map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve password: {e}"))
            })?),
            (None, None) => None,
        };

        let allow_unverified_tls = match env_value(env(ENV_ALLOW_UNVERIFIED_TLS)) {
            Some(raw) => parse_bool(ENV_ALLOW_UNVERIFIED_TLS, &raw)?,
            None => self.allow_unverified_tls,
        };
        let poll_interval = match env_value(env(ENV_POLL_INTERVAL)) {
            Some(raw) => parse_secs(ENV_POLL_INTERVAL, &raw)?,
            None => self.poll_interval(),
        };

        Ok(ResolvedProfile {
            base_url: build_base_url(&host, self.port),
            username,
            password,
            allow_unverified_tls,
            poll_interval,
            refresh_after: self.refresh_after(),
        })
    }
}

impl ResolvedProfile {
    /// A complete connection from the `VCF_*` variables alone
    ///
    /// `None` unless host, username and password are all set.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(host), Some(username), Some(password)) = (
            env_value(Some(ENV_HOST)),
            env_value(Some(ENV_USERNAME)),
            env_value(Some(ENV_PASSWORD)),
        ) else {
            return Ok(None);
        };

        let allow_unverified_tls = match env_value(Some(ENV_ALLOW_UNVERIFIED_TLS)) {
            Some(raw) => parse_bool(ENV_ALLOW_UNVERIFIED_TLS, &raw)?,
            None => false,
        };
        let poll_interval = match env_value(Some(ENV_POLL_INTERVAL)) {
            Some(raw) => parse_secs(ENV_POLL_INTERVAL, &raw)?,
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Some(Self {
            base_url: build_base_url(&host, None),
            username,
            password: Some(password),
            allow_unverified_tls,
            poll_interval,
            refresh_after: DEFAULT_REFRESH_AFTER,
        }))
    }

    /// Session builder for these settings; the password must be known
    pub fn session_builder(&self) -> Result<SessionBuilder> {
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| ConfigError::MissingPassword {
                username: self.username.clone(),
            })?;
        Ok(SessionBuilder::default()
            .base_url(&self.base_url)
            .username(&self.username)
            .password(password)
            .insecure(self.allow_unverified_tls)
            .refresh_after(self.refresh_after))
    }
}

fn env_value(var: Option<&str>) -> Option<String> {
    var.and_then(|v| std::env::var(v).ok())
        .filter(|value| !value.is_empty())
}

fn build_base_url(host: &str, port: Option<u16>) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        return host.to_string();
    }
    match port {
        Some(port) => format!("https://{host}:{port}"),
        None => format!("https://{host}"),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

impl Config {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path, creating parent directories
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    pub fn get_profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Pick a profile: explicit name, then the default, then the first by name
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            self.get_profile(name)?;
            return Ok(name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        if let Some((name, _)) = self.list_profiles().first() {
            return Ok((*name).clone());
        }

        Err(ConfigError::NoProfiles {
            suggestion: format!(
                "Use 'vcfctl profile set' to create one, or set {ENV_HOST}, {ENV_USERNAME} and {ENV_PASSWORD}."
            ),
        })
    }

    /// Get the path to the configuration file
    ///
    /// On macOS the Linux-style `~/.config/vcfctl/config.toml` is used when it
    /// (or its directory) exists, falling back to the platform path.
    ///
    /// On Linux: ~/.config/vcfctl/config.toml
    /// On Windows: %APPDATA%\vcfctl\vcfctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("vcfctl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path.parent().is_some_and(|p| p.exists())
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "vcfctl", "vcfctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unset variables without a default are left as written, so a profile
    /// nobody uses does not need its variables set.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}
