use std::path::Path;

use super::package::PackageManager;
use crate::error::Error;

pub const OS_RELEASE: &str = "/etc/os-release";

pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

pub fn require_root() -> anyhow::Result<()> {
    if !is_root() {
        return Err(Error::Environment("this command must be run as root".to_string()).into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    pub fn parse(content: &str) -> Self {
        let mut id = String::new();
        let mut id_like = vec![];
        let mut pretty_name = None;
        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key {
                "ID" => id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    id_like = value
                        .split_whitespace()
                        .map(|s| s.to_ascii_lowercase())
                        .collect()
                }
                "PRETTY_NAME" => pretty_name = Some(value.to_string()),
                _ => {}
            }
        }
        Self {
            id,
            id_like,
            pretty_name,
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Environment(format!("can't read {}: {e}", path.display())))?;
        Ok(Self::parse(&content))
    }

    fn families(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.id_like.iter().map(String::as_str))
    }

    /// Package manager family for this distribution. `has_dnf` decides between
    /// dnf and yum on the Red Hat side.
    pub fn package_manager(&self, has_dnf: bool) -> anyhow::Result<PackageManager> {
        for family in self.families() {
            match family {
                "debian" | "ubuntu" => return Ok(PackageManager::Apt),
                "fedora" => return Ok(PackageManager::Dnf),
                "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "amzn" => {
                    return Ok(if has_dnf {
                        PackageManager::Dnf
                    } else {
                        PackageManager::Yum
                    })
                }
                _ => {}
            }
        }
        Err(Error::Environment(format!(
            "unsupported operating system: {}",
            self.pretty_name.as_deref().unwrap_or(&self.id)
        ))
        .into())
    }
}

/// Release asset suffix for a Rust target arch.
pub fn release_arch(arch: &str) -> anyhow::Result<&'static str> {
    Ok(match arch {
        "x86_64" | "amd64" => "amd64",
        "aarch64" | "arm64" => "arm64",
        "arm" | "armv7" | "armv7l" => "armv7",
        "x86" | "i386" | "i686" => "386",
        "s390x" => "s390x",
        other => {
            return Err(Error::Environment(format!("unsupported CPU architecture: {other}")).into())
        }
    })
}

pub fn current_arch() -> anyhow::Result<&'static str> {
    release_arch(std::env::consts::ARCH)
}
