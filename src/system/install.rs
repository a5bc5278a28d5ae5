use std::path::Path;

use super::Runner;
use crate::error::Error;
use crate::lookup::Fetch;

pub fn asset_name(version: &str, arch: &str) -> String {
    format!("sing-box-{version}-linux-{arch}")
}

pub fn download_url(repo: &str, version: &str, arch: &str) -> String {
    format!(
        "https://github.com/{repo}/releases/download/v{version}/{}.tar.gz",
        asset_name(version, arch)
    )
}

/// Downloads the release tarball, unpacks it with `tar` and installs the binary
/// at `binary`. The new file is staged next to `binary` and renamed over it, so
/// a copy that is still running keeps its old inode.
pub async fn install_binary(
    fetch: &dyn Fetch,
    runner: &dyn Runner,
    repo: &str,
    version: &str,
    arch: &str,
    binary: &Path,
) -> anyhow::Result<()> {
    let workdir = tempfile::tempdir().map_err(|e| Error::io(std::env::temp_dir(), e))?;
    let tarball = workdir.path().join("sing-box.tar.gz");

    fetch
        .download(&download_url(repo, version, arch), &tarball)
        .await?;

    let tarball_arg = tarball.to_string_lossy();
    let workdir_arg = workdir.path().to_string_lossy();
    runner
        .run("tar", &["-xzf", &tarball_arg, "-C", &workdir_arg])
        .await
        .map_err(|e| Error::Environment(format!("extracting release failed: {e}")))?;

    let extracted = workdir
        .path()
        .join(asset_name(version, arch))
        .join("sing-box");
    if let Some(parent) = binary.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    let staged = binary.with_extension("new");
    tokio::fs::copy(&extracted, &staged)
        .await
        .map_err(|e| Error::io(&staged, e))?;
    set_executable(&staged).await?;
    tokio::fs::rename(&staged, binary)
        .await
        .map_err(|e| Error::io(binary, e))?;

    log::info!("sing-box {version} installed to {}", binary.display());
    Ok(())
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_executable(_: &Path) -> anyhow::Result<()> {
    Ok(())
}
