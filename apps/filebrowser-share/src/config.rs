//! Share CLI configuration.
//!
//! Configuration is read from TOML at
//! `<user config dir>/justanyone/filebrowser-service-menu/config.toml`:
//! - Linux: `$XDG_CONFIG_HOME` or `~/.config`
//! - Windows: `%APPDATA%`
//! - macOS: `~/Library/Application Support`
//!
//! Unlike most tools the file is never created with defaults; the
//! credentials have to be filled in by the user.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors from locating, reading or validating the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not get user config dir: {0}")]
    NoConfigDir(&'static str),

    #[error("config file does not exist at {}", .0.display())]
    Missing(PathBuf),

    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not decode config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config field {0} is not set")]
    Blank(&'static str),
}

/// Share CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the File Browser instance.
    #[serde(default, alias = "InstanceUrl", alias = "instanceUrl")]
    pub instance_url: String,

    #[serde(default, alias = "Username")]
    pub username: String,

    #[serde(default, alias = "Password")]
    pub password: String,

    /// Share lifetime in days when `--permanent` is not given.
    #[serde(default = "default_expiry_days", alias = "ExpiryDays")]
    pub expiry_days: u32,

    /// `expires` value sent for permanent shares. Empty omits the field.
    #[serde(default = "default_permanent_expires", alias = "PermanentExpires")]
    pub permanent_expires: String,
}

fn default_expiry_days() -> u32 {
    30
}

fn default_permanent_expires() -> String {
    fbshare_filebrowser::DEFAULT_PERMANENT_EXPIRES.into()
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks that every required field holds more than whitespace.
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("InstanceUrl", &self.instance_url),
            ("Username", &self.username),
            ("Password", &self.password),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((name, _)) => Err(ConfigError::Blank(*name)),
            None => Ok(()),
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(user_config_dir(|key| std::env::var_os(key))?
        .join("justanyone")
        .join("filebrowser-service-menu")
        .join("config.toml"))
}

fn user_config_dir(var: impl Fn(&str) -> Option<OsString>) -> Result<PathBuf, ConfigError> {
    let var = |key: &str| var(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    #[cfg(target_os = "windows")]
    {
        var("APPDATA").ok_or(ConfigError::NoConfigDir("%AppData% is not defined"))
    }

    #[cfg(target_os = "macos")]
    {
        var("HOME")
            .map(|home| home.join("Library").join("Application Support"))
            .ok_or(ConfigError::NoConfigDir("$HOME is not defined"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        var("XDG_CONFIG_HOME")
            .or_else(|| var("HOME").map(|home| home.join(".config")))
            .ok_or(ConfigError::NoConfigDir(
                "neither $XDG_CONFIG_HOME nor $HOME are defined",
            ))
    }
}
