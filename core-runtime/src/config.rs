//! # Configuration Module
//!
//! Provides configuration management for the sync tool.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`SyncSettings`] instance. It enforces fail-fast validation: every missing
//! required value is reported at once, before any sync attempt.
//!
//! ## Environment
//!
//! | variable | required | default |
//! |---|---|---|
//! | `NOTION_TOKEN` | yes | |
//! | `NOTION_DATABASE_ID` | yes | |
//! | `WATCH_DIR` | yes | |
//! | `DEVICE_NAME` | no | `DockerWorker` |
//! | `LINK_MODE` | no | `file` (`file` or `server`) |
//! | `MAGIC_LINK_PORT` | no | `12345` |
//! | `LOG_FORMAT` | no | build dependent |
//! | `LOG_LEVEL` | no | `info` |
//! | `RUST_LOG` | no | overrides the computed filter |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SyncSettings;
//!
//! let settings = SyncSettings::builder()
//!     .notion_token("secret_abc")
//!     .database_id("0123456789abcdef0123456789abcdef")
//!     .watch_dir("/data")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::{redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_WATCH_DIR: &str = "WATCH_DIR";
pub const ENV_DEVICE_NAME: &str = "DEVICE_NAME";
pub const ENV_LINK_MODE: &str = "LINK_MODE";
pub const ENV_LINK_PORT: &str = "MAGIC_LINK_PORT";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Device label used when `DEVICE_NAME` is not set
pub const DEFAULT_DEVICE_NAME: &str = "DockerWorker";

/// Port of the localhost link server when `MAGIC_LINK_PORT` is not set
pub const DEFAULT_LINK_PORT: u16 = 12345;

/// Which magic-link strategy to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// `file://` URIs, no helper process required
    #[default]
    FileUri,
    /// `http://localhost:<port>/open?f=…` served by a local helper
    LocalServer,
}

impl FromStr for LinkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "file-uri" | "passive" => Ok(LinkMode::FileUri),
            "server" | "localhost" | "active" => Ok(LinkMode::LocalServer),
            other => Err(Error::Config(format!("Unknown link mode: {}", other))),
        }
    }
}

/// Process configuration for one sync run
#[derive(Clone)]
pub struct SyncSettings {
    /// Notion integration token
    pub notion_token: String,

    /// Target database id, as given (normalized by the Notion provider)
    pub database_id: String,

    /// Root of the tree to mirror
    pub watch_dir: PathBuf,

    /// Label of the device owning the records
    pub device_name: String,

    /// Magic link strategy
    pub link_mode: LinkMode,

    /// Port used by [`LinkMode::LocalServer`]
    pub link_server_port: u16,

    /// Logging setup
    pub logging: LoggingConfig,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field(
                "notion_token",
                &redact_if_sensitive("notion_token", &self.notion_token),
            )
            .field("database_id", &self.database_id)
            .field("watch_dir", &self.watch_dir)
            .field("device_name", &self.device_name)
            .field("link_mode", &self.link_mode)
            .field("link_server_port", &self.link_server_port)
            .field("logging", &self.logging)
            .finish()
    }
}

impl SyncSettings {
    /// Create a new builder
    pub fn builder() -> SyncSettingsBuilder {
        SyncSettingsBuilder::default()
    }

    /// Load settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSettings`] naming every absent required
    /// variable, or [`Error::Config`] for malformed optional values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = SyncSettings::builder();

        if let Some(token) = value(ENV_NOTION_TOKEN) {
            builder = builder.notion_token(token);
        }
        if let Some(database_id) = value(ENV_DATABASE_ID) {
            builder = builder.database_id(database_id);
        }
        if let Some(watch_dir) = value(ENV_WATCH_DIR) {
            builder = builder.watch_dir(watch_dir);
        }
        if let Some(device_name) = value(ENV_DEVICE_NAME) {
            builder = builder.device_name(device_name);
        }
        if let Some(mode) = value(ENV_LINK_MODE) {
            builder = builder.link_mode(mode.parse()?);
        }
        if let Some(port) = value(ENV_LINK_PORT) {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", ENV_LINK_PORT, e)))?;
            builder = builder.link_server_port(port);
        }

        let mut logging = LoggingConfig::default();
        if let Some(format) = value(ENV_LOG_FORMAT) {
            logging = logging.with_format(format.parse::<LogFormat>()?);
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            logging = logging.with_level(level.parse::<LogLevel>()?);
        }
        if let Some(filter) = value(ENV_LOG_FILTER) {
            logging = logging.with_filter(filter);
        }

        builder.logging(logging).build()
    }

    /// Whether the watch directory is present on disk
    pub fn watch_dir_exists(&self) -> bool {
        self.watch_dir.is_dir()
    }
}

/// Builder for [`SyncSettings`]
#[derive(Debug, Default)]
pub struct SyncSettingsBuilder {
    notion_token: Option<String>,
    database_id: Option<String>,
    watch_dir: Option<PathBuf>,
    device_name: Option<String>,
    link_mode: Option<LinkMode>,
    link_server_port: Option<u16>,
    logging: Option<LoggingConfig>,
}

impl SyncSettingsBuilder {
    pub fn notion_token(mut self, token: impl Into<String>) -> Self {
        self.notion_token = Some(token.into());
        self
    }

    pub fn database_id(mut self, id: impl Into<String>) -> Self {
        self.database_id = Some(id.into());
        self
    }

    pub fn watch_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.watch_dir = Some(path.into());
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = Some(mode);
        self
    }

    pub fn link_server_port(mut self, port: u16) -> Self {
        self.link_server_port = Some(port);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Validate and build the settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSettings`] listing every missing required value.
    pub fn build(self) -> Result<SyncSettings> {
        let mut missing = Vec::new();
        if self.notion_token.is_none() {
            missing.push(ENV_NOTION_TOKEN.to_string());
        }
        if self.database_id.is_none() {
            missing.push(ENV_DATABASE_ID.to_string());
        }
        if self.watch_dir.is_none() {
            missing.push(ENV_WATCH_DIR.to_string());
        }

        match (self.notion_token, self.database_id, self.watch_dir) {
            (Some(notion_token), Some(database_id), Some(watch_dir)) => Ok(SyncSettings {
                notion_token,
                database_id,
                watch_dir,
                device_name: self
                    .device_name
                    .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string()),
                link_mode: self.link_mode.unwrap_or_default(),
                link_server_port: self.link_server_port.unwrap_or(DEFAULT_LINK_PORT),
                logging: self.logging.unwrap_or_default(),
            }),
            _ => Err(Error::MissingSettings(missing)),
        }
    }
}
