//! Configuration types for usenet-indexer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// News server connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    #[serde(default)]
    pub host: String,

    /// Server port (default: 119)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for AUTHINFO (None = no authentication)
    #[serde(default)]
    pub username: Option<String>,

    /// Password for AUTHINFO
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum simultaneous connections to open when scanning (default: 1)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: None,
            password: None,
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// `host:port` address string for connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Group scanning behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum articles requested per overview command (default: 10,000)
    #[serde(default = "default_max_chunk")]
    pub max_chunk: i64,

    /// How far back to start when a group has never been scanned
    /// (default: 10,000 articles below the server high-water mark)
    #[serde(default = "default_backfill_limit")]
    pub backfill_limit: i64,

    /// Record message numbers missing from overview responses.
    ///
    /// Costs O(range size) per chunk, so off by default.
    #[serde(default)]
    pub track_missed: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_chunk: default_max_chunk(),
            backfill_limit: default_backfill_limit(),
            track_missed: false,
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// News server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Scanning behavior
    #[serde(default)]
    pub scan: ScanConfig,

    /// Percentage of declared segment bytes required before a binary may
    /// be promoted to a release (default: 100)
    #[serde(default = "default_promote_threshold")]
    pub promote_threshold: u8,

    /// Path to the SQLite database file (default: "./indexer.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scan: ScanConfig::default(),
            promote_threshold: default_promote_threshold(),
            database_path: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_chunk < 1 {
            return Err(Error::Config {
                message: "max_chunk must be at least 1".into(),
                key: Some("scan.max_chunk".into()),
            });
        }
        if self.scan.backfill_limit < 0 {
            return Err(Error::Config {
                message: "backfill_limit cannot be negative".into(),
                key: Some("scan.backfill_limit".into()),
            });
        }
        if self.server.max_connections == 0 {
            return Err(Error::Config {
                message: "max_connections must be at least 1".into(),
                key: Some("server.max_connections".into()),
            });
        }
        if self.promote_threshold == 0 || self.promote_threshold > 100 {
            return Err(Error::Config {
                message: "promote_threshold must be between 1 and 100".into(),
                key: Some("promote_threshold".into()),
            });
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    119
}

fn default_max_connections() -> usize {
    1
}

fn default_max_chunk() -> i64 {
    10_000
}

fn default_backfill_limit() -> i64 {
    10_000
}

fn default_promote_threshold() -> u8 {
    100
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./indexer.db")
}
