use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::config::Settings;
use crate::document::build_server_config;
use crate::lookup::{latest_version, Fetch};
use crate::params::ServerParams;
use crate::prompt::{derive_params, Prompter};
use crate::system::{
    firewall::open_port,
    host::{current_arch, OsRelease},
    install::install_binary,
    package::ensure_dependencies,
    service::install_service,
    Runner,
};
use crate::uri::encode_uri;

#[derive(Debug, Default, Clone, Copy)]
pub struct Options {
    pub skip_service: bool,
    pub skip_firewall: bool,
}

#[derive(Debug)]
pub struct Outcome {
    pub params: ServerParams,
    pub uri: String,
}

/// Packages, release lookup and the binary itself.
pub async fn prepare_host(
    settings: &Settings,
    runner: &dyn Runner,
    fetch: &dyn Fetch,
    os_release: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let os = OsRelease::read(os_release).await?;
    let manager = os.package_manager(runner.exists("dnf").await)?;
    log::info!(
        "detected {} ({})",
        os.pretty_name.as_deref().unwrap_or(&os.id),
        manager.program()
    );
    let arch = current_arch()?;
    ensure_dependencies(runner, manager).await?;

    let version = match settings.release.version {
        Some(ref version) => version.trim_start_matches('v').to_string(),
        None => latest_version(fetch, &settings.release.repo).await?,
    };
    log::info!("installing sing-box {version} for linux-{arch}");
    install_binary(fetch, runner, &settings.release.repo, &version, arch, &settings.paths.binary).await
}

/// Derives the parameters, writes the config and optionally the service and
/// firewall rules. Returns the share link for the result.
pub async fn configure<R, W>(
    settings: &Settings,
    runner: &dyn Runner,
    fetch: &dyn Fetch,
    prompter: &mut Prompter<R, W>,
    options: Options,
) -> anyhow::Result<Outcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let params = derive_params(prompter, &settings.answers, fetch, &settings.lookup.ip_endpoints).await?;

    build_server_config(&params)
        .write_to(&settings.paths.config)
        .await?;

    if options.skip_service {
        log::info!("skipping service installation");
    } else {
        install_service(runner, &settings.paths.unit, &settings.paths.binary, &settings.paths.config).await?;
    }

    if options.skip_firewall {
        log::info!("skipping firewall rules");
    } else {
        open_port(runner, params.port).await?;
    }

    let uri = encode_uri(&params);
    Ok(Outcome { params, uri })
}
