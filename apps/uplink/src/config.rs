//! CLI configuration.
//!
//! Stored as TOML at `~/.config/uplink/uplink.toml` unless `--config` names
//! another file. Upload settings sit at the top level; see [`UploadConfig`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uplink_transfer::UploadConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory `send` reads files from.
    #[serde(default = "default_outbox")]
    pub outbox: PathBuf,

    /// Directory `receive` stores uploads in.
    #[serde(default = "default_inbox")]
    pub inbox: PathBuf,

    /// Address `receive` listens on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    #[serde(flatten)]
    pub upload: UploadConfig,
}

fn default_outbox() -> PathBuf {
    PathBuf::from(".")
}

fn default_inbox() -> PathBuf {
    PathBuf::from("inbox")
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 557))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outbox: default_outbox(),
            inbox: default_inbox(),
            bind: default_bind(),
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `None`. A missing file is
    /// created with defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("uplink")
        .join("uplink.toml")
}
