//! TOML configuration types for hourgate.
//!
//! The top-level [`AppConfig`] is deserialized from `hourgate.toml`. Every
//! field has a default, so an empty file (or no file at all) yields a usable
//! configuration pointing at `whitelist.txt`, `blacklist.txt` and `rules.txt`
//! in the working directory.
//!
//! # Example `hourgate.toml`
//!
//! ```toml
//! [policy]
//! whitelist = "/etc/hourgate/whitelist.txt"
//! blacklist = "/etc/hourgate/blacklist.txt"
//! rules = "/etc/hourgate/rules.txt"
//! reload_interval_secs = 60
//! verbose = 1
//!
//! [admin]
//! listen = "127.0.0.1:9998"
//! token = "change-me"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where the three policy files live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicySources {
    pub whitelist: PathBuf,
    pub blacklist: PathBuf,
    pub rules: PathBuf,
}

impl Default for PolicySources {
    fn default() -> Self {
        Self {
            whitelist: PathBuf::from("whitelist.txt"),
            blacklist: PathBuf::from("blacklist.txt"),
            rules: PathBuf::from("rules.txt"),
        }
    }
}

/// How often the policy files are re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadInterval {
    /// Only the startup load applies; explicit reloads still work.
    Disabled,
    Every(Duration),
}

impl ReloadInterval {
    /// Zero or negative seconds disable periodic reload.
    pub fn from_secs(secs: i64) -> Self {
        if secs <= 0 {
            ReloadInterval::Disabled
        } else {
            ReloadInterval::Every(Duration::from_secs(secs as u64))
        }
    }

    pub fn period(&self) -> Option<Duration> {
        match self {
            ReloadInterval::Disabled => None,
            ReloadInterval::Every(d) => Some(*d),
        }
    }
}

/// Policy engine configuration (`[policy]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Whitelist file: one host pattern per line.
    #[serde(default = "default_whitelist")]
    pub whitelist: PathBuf,
    /// Blacklist file: one host pattern per line.
    #[serde(default = "default_blacklist")]
    pub blacklist: PathBuf,
    /// Time-window rules file: `host,minHour,maxHour` rows.
    #[serde(default = "default_rules")]
    pub rules: PathBuf,
    /// Seconds between periodic reloads. `0` or negative disables them.
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: i64,
    /// Logging level; above zero every list decision is audited.
    #[serde(default)]
    pub verbose: u8,
}

impl PolicyConfig {
    pub fn sources(&self) -> PolicySources {
        PolicySources {
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
            rules: self.rules.clone(),
        }
    }

    pub fn reload_interval(&self) -> ReloadInterval {
        ReloadInterval::from_secs(self.reload_interval_secs)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            blacklist: default_blacklist(),
            rules: default_rules(),
            reload_interval_secs: default_reload_interval_secs(),
            verbose: 0,
        }
    }
}

fn default_whitelist() -> PathBuf {
    PolicySources::default().whitelist
}

fn default_blacklist() -> PathBuf {
    PolicySources::default().blacklist
}

fn default_rules() -> PathBuf {
    PolicySources::default().rules
}

fn default_reload_interval_secs() -> i64 {
    60
}

/// Admin API configuration (`[admin]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Address the admin API binds to.
    #[serde(default = "default_admin_listen")]
    pub listen: String,
    /// Literal bearer credential required by mutating routes. `None` leaves them open.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: default_admin_listen(),
            token: None,
        }
    }
}

fn default_admin_listen() -> String {
    "127.0.0.1:9998".to_string()
}

/// Top-level application configuration deserialized from `hourgate.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load and parse the configuration from a TOML file at the given path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
