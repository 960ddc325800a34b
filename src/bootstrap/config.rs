//! # Configuration Loader
//!
//! Two steps:
//!
//! - [`load_config`] reads a TOML file into the [`AppConfig`] DTO and accepts
//!   whatever is in it. Empty strings and zeros are facts, not errors.
//! - [`resolve_config`] turns those facts into the settings the runtime is built
//!   from, filling every empty value from the per-user data directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use pt_core::app_dirs::AppDirs;
use pt_core::config::AppConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_DATABASE_FILE: &str = "postit.db";
const DEFAULT_REGISTRY_FILE: &str = "surfaces.json";
const DEFAULT_INBOX_FILE: &str = "share-inbox.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_MAX_LIVE_SURFACES: usize = 8;
const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ICON_SIZE: u32 = 60;

/// Settings the runtime is wired from. Every field is usable as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub surface_registry_path: PathBuf,
    pub surface_poll_interval: Duration,
    pub max_live_surfaces: usize,
    pub share_inbox_path: PathBuf,
    pub metadata_timeout: Duration,
    pub metadata_user_agent: String,
    pub metadata_icon_size: u32,
}

/// Load configuration from a TOML file
///
/// No validation is performed: missing sections map to empty values.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// Fills empty config values from the application data directory.
pub fn resolve_config(config: AppConfig, app_dirs: &AppDirs) -> ResolvedConfig {
    let root = &app_dirs.app_data_root;
    let path_or = |path: PathBuf, default: &str| {
        if path.as_os_str().is_empty() {
            root.join(default)
        } else {
            path
        }
    };

    ResolvedConfig {
        database_path: path_or(config.database_path, DEFAULT_DATABASE_FILE),
        surface_registry_path: path_or(config.surface_registry_path, DEFAULT_REGISTRY_FILE),
        surface_poll_interval: Duration::from_millis(nonzero_or(
            config.surface_poll_interval_ms,
            DEFAULT_POLL_INTERVAL_MS,
        )),
        max_live_surfaces: match config.max_live_surfaces {
            0 => DEFAULT_MAX_LIVE_SURFACES,
            n => n as usize,
        },
        share_inbox_path: path_or(config.share_inbox_path, DEFAULT_INBOX_FILE),
        metadata_timeout: Duration::from_secs(nonzero_or(
            config.metadata_timeout_secs,
            DEFAULT_METADATA_TIMEOUT_SECS,
        )),
        metadata_user_agent: if config.metadata_user_agent.trim().is_empty() {
            format!("postit/{}", env!("CARGO_PKG_VERSION"))
        } else {
            config.metadata_user_agent
        },
        metadata_icon_size: match config.metadata_icon_size {
            0 => DEFAULT_ICON_SIZE,
            n => n,
        },
    }
}

/// Loads `explicit` if given, otherwise `config.toml` in the data directory when it
/// exists, otherwise nothing but defaults.
pub fn load_resolved(
    explicit: Option<PathBuf>,
    app_dirs: &AppDirs,
) -> anyhow::Result<ResolvedConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = default_config_path(app_dirs);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                AppConfig::default()
            }
        }
    };
    Ok(resolve_config(config, app_dirs))
}

pub fn default_config_path(app_dirs: &AppDirs) -> PathBuf {
    app_dirs.app_data_root.join(CONFIG_FILE_NAME)
}

fn nonzero_or(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}
