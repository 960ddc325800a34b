//! # Pure Data Module - Data Transfer Objects Only
//!
//! Defines the configuration data structures and the TOML → DTO mapping.
//!
//! This module contains data only: no policy, no validation, no default value
//! calculation. Empty strings and zero values are valid "facts"; the shell decides
//! what they resolve to.

use std::path::PathBuf;

/// Application configuration DTO (pure data, no logic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database path
    pub database_path: PathBuf,

    /// State file of the desktop surface registry
    pub surface_registry_path: PathBuf,

    /// How often surface observers poll the registry
    pub surface_poll_interval_ms: u64,

    /// Maximum number of simultaneously live surfaces (0 = shell default)
    pub max_live_surfaces: u32,

    /// Share hand-off inbox file
    pub share_inbox_path: PathBuf,

    /// Metadata fetch timeout
    pub metadata_timeout_secs: u64,

    /// User agent sent when fetching link metadata
    pub metadata_user_agent: String,

    /// Edge length of the square icon thumbnail
    pub metadata_icon_size: u32,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    ///
    /// **Prohibited**: This method must NOT contain any validation or default value
    /// logic. Missing keys map to empty values.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let str_at = |section: &str, key: &str| -> String {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let int_at = |section: &str, key: &str| -> i64 {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_integer())
                .unwrap_or(0)
        };

        Ok(Self {
            database_path: PathBuf::from(str_at("storage", "database_path")),
            surface_registry_path: PathBuf::from(str_at("surface", "registry_path")),
            surface_poll_interval_ms: int_at("surface", "poll_interval_ms") as u64,
            max_live_surfaces: int_at("surface", "max_live_surfaces") as u32,
            share_inbox_path: PathBuf::from(str_at("share", "inbox_path")),
            metadata_timeout_secs: int_at("metadata", "timeout_secs") as u64,
            metadata_user_agent: str_at("metadata", "user_agent"),
            metadata_icon_size: int_at("metadata", "icon_size") as u32,
        })
    }
}
