use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod answers;

pub use answers::Answers;

fn binary_default_value() -> PathBuf {
    PathBuf::from("/usr/local/bin/sing-box")
}

fn config_default_value() -> PathBuf {
    PathBuf::from("/etc/sing-box/config.json")
}

fn unit_default_value() -> PathBuf {
    PathBuf::from("/etc/systemd/system/sing-box.service")
}

fn repo_default_value() -> String {
    "SagerNet/sing-box".to_string()
}

fn ip_endpoints_default_value() -> Vec<String> {
    vec![
        "https://api.ipify.org".to_string(),
        "https://ifconfig.me/ip".to_string(),
        "https://icanhazip.com".to_string(),
    ]
}

const fn timeout_default_value() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paths {
    #[serde(default = "binary_default_value")]
    pub binary: PathBuf,
    #[serde(default = "config_default_value")]
    pub config: PathBuf,
    #[serde(default = "unit_default_value")]
    pub unit: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            binary: binary_default_value(),
            config: config_default_value(),
            unit: unit_default_value(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Release {
    #[serde(default = "repo_default_value")]
    pub repo: String,
    /// Pinned version; the latest release is looked up when absent.
    pub version: Option<String>,
}

impl Default for Release {
    fn default() -> Self {
        Self {
            repo: repo_default_value(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Lookup {
    #[serde(default = "ip_endpoints_default_value")]
    pub ip_endpoints: Vec<String>,
    #[serde(default = "timeout_default_value")]
    pub timeout_secs: u64,
}

impl Default for Lookup {
    fn default() -> Self {
        Self {
            ip_endpoints: ip_endpoints_default_value(),
            timeout_secs: timeout_default_value(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub release: Release,
    #[serde(default)]
    pub lookup: Lookup,
    #[serde(default)]
    pub answers: Answers,
}

impl Settings {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Can't read settings {}", path.display()))?;
        let settings = Self::parse(&content)?;
        log::info!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Loads `path` when given, defaults otherwise.
    pub async fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }
}
