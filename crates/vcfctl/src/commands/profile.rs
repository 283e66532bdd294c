//! Profile management command implementations

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{Result as CliResult, VcfCtlError};
use crate::output::print_json;
use serde_json::json;
use tracing::{debug, info};
use vcfctl_core::config::{ConfigError, CredentialStore};
use vcfctl_core::{Config, Profile};

/// Handle profile management commands
pub fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &mut ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            host,
            port,
            username,
            password,
            allow_unverified_tls,
            poll_interval,
            default,
            #[cfg(feature = "secure-storage")]
            use_keyring,
        } => {
            #[cfg(not(feature = "secure-storage"))]
            let use_keyring = &false;
            let profile = Profile {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                password: store_password(name, password.as_deref(), *use_keyring)?,
                allow_unverified_tls: *allow_unverified_tls,
                poll_interval_secs: *poll_interval,
                refresh_after_secs: None,
            };
            handle_set(conn_mgr, name, profile, *default)
        }
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn config_path_display(conn_mgr: &ConnectionManager) -> Option<String> {
    conn_mgr
        .config_path
        .clone()
        .or_else(|| Config::config_path().ok())
        .map(|p| p.display().to_string())
}

fn password_state(profile: &Profile) -> &'static str {
    match &profile.password {
        Some(p) if CredentialStore::is_keyring_reference(p) => "keyring",
        Some(_) => "stored",
        None => "prompt",
    }
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let profiles = conn_mgr.config.list_profiles();
    debug!("Found {} profiles", profiles.len());
    let default = conn_mgr.config.default_profile.as_deref();

    if output_format.is_json() {
        let list: Vec<_> = profiles
            .iter()
            .map(|(name, profile)| {
                json!({
                    "name": name,
                    "base_url": profile.base_url(),
                    "username": profile.username,
                    "is_default": default == Some(name.as_str()),
                })
            })
            .collect();
        return print_json(&json!({
            "config_path": config_path_display(conn_mgr),
            "profiles": list,
        }));
    }

    if profiles.is_empty() {
        println!("No profiles configured.");
        println!("Create one with: vcfctl profile set <name> --host <host> --username <user>");
        return Ok(());
    }

    println!("{:<2}{:<20} {:<40} USERNAME", "", "NAME", "URL");
    for (name, profile) in profiles {
        let marker = if default == Some(name.as_str()) { "*" } else { "" };
        println!(
            "{:<2}{:<20} {:<40} {}",
            marker,
            name,
            profile.base_url(),
            profile.username
        );
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = config_path_display(conn_mgr).ok_or(ConfigError::ConfigDirError)?;
    if output_format.is_json() {
        print_json(&json!({ "config_path": path }))
    } else {
        println!("{path}");
        Ok(())
    }
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.get_profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);

    if output_format.is_json() {
        return print_json(&json!({
            "name": name,
            "base_url": profile.base_url(),
            "username": profile.username,
            "password": password_state(profile),
            "allow_unverified_tls": profile.allow_unverified_tls,
            "poll_interval_secs": profile.poll_interval().as_secs(),
            "is_default": is_default,
        }));
    }

    println!("Profile:        {name}{}", if is_default { " (default)" } else { "" });
    println!("URL:            {}", profile.base_url());
    println!("Username:       {}", profile.username);
    println!("Password:       {}", password_state(profile));
    println!("Unverified TLS: {}", profile.allow_unverified_tls);
    println!("Poll interval:  {}s", profile.poll_interval().as_secs());
    Ok(())
}

fn store_password(
    name: &str,
    password: Option<&str>,
    use_keyring: bool,
) -> CliResult<Option<String>> {
    let Some(password) = password else {
        return Ok(None);
    };
    if !use_keyring {
        return Ok(Some(password.to_string()));
    }

    let store = CredentialStore::new();
    let stored = store.store_credential(&format!("{name}-password"), password)?;
    if CredentialStore::is_keyring_reference(&stored) {
        println!("Password stored securely in OS keyring");
    } else {
        println!("OS keyring unavailable, password stored in the config file");
    }
    Ok(Some(stored))
}

fn handle_set(
    conn_mgr: &mut ConnectionManager,
    name: &str,
    profile: Profile,
    make_default: bool,
) -> CliResult<()> {
    if profile.host.trim().is_empty() {
        return Err(VcfCtlError::InvalidInput {
            message: "host must not be empty".to_string(),
        });
    }

    let replaced = conn_mgr.config.profiles.contains_key(name);
    conn_mgr.config.set_profile(name.to_string(), profile);
    if make_default || conn_mgr.config.default_profile.is_none() {
        conn_mgr.config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config()?;

    info!("Saved profile {}", name);
    let verb = if replaced { "Updated" } else { "Created" };
    println!("{verb} profile '{name}'");
    Ok(())
}

fn handle_remove(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    let profile = conn_mgr
        .config
        .remove_profile(name)
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
        })?;

    if let Some(password) = &profile.password {
        CredentialStore::new().delete_credential(password)?;
    }
    conn_mgr.save_config()?;

    println!("Removed profile '{name}'");
    Ok(())
}

fn handle_default(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    conn_mgr.config.get_profile(name)?;
    conn_mgr.config.default_profile = Some(name.to_string());
    conn_mgr.save_config()?;

    println!("Default profile set to '{name}'");
    Ok(())
}
