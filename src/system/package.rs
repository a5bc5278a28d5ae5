use super::Runner;
use crate::error::Error;

/// Programs the installer shells out to.
pub const REQUIRED_PROGRAMS: &[&str] = &["tar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
        }
    }

    pub async fn install(&self, runner: &dyn Runner, packages: &[&str]) -> anyhow::Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        log::info!("installing {} with {}", packages.join(" "), self.program());
        if *self == PackageManager::Apt {
            runner
                .run("apt-get", &["update", "-y"])
                .await
                .map_err(|e| Error::Environment(format!("apt-get update failed: {e}")))?;
        }
        let mut args = vec!["install", "-y"];
        args.extend_from_slice(packages);
        runner
            .run(self.program(), &args)
            .await
            .map_err(|e| Error::Environment(format!("package install failed: {e}")))?;
        Ok(())
    }
}

/// Installs whatever of [`REQUIRED_PROGRAMS`] is missing.
pub async fn ensure_dependencies(runner: &dyn Runner, manager: PackageManager) -> anyhow::Result<()> {
    let mut missing = vec![];
    for program in REQUIRED_PROGRAMS {
        if !runner.exists(program).await {
            log::warn!("{program} is missing, installing it");
            missing.push(*program);
        }
    }
    manager.install(runner, &missing).await
}
