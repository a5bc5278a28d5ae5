use std::path::Path;

use super::Runner;
use crate::error::Error;

pub const SERVICE_NAME: &str = "sing-box";

pub fn render_unit(binary: &Path, config: &Path) -> String {
    format!(
        "[Unit]
Description=sing-box service
Documentation=https://sing-box.sagernet.org
After=network.target nss-lookup.target

[Service]
CapabilityBoundingSet=CAP_NET_ADMIN CAP_NET_BIND_SERVICE CAP_NET_RAW
AmbientCapabilities=CAP_NET_ADMIN CAP_NET_BIND_SERVICE CAP_NET_RAW
ExecStart={binary} run -c {config}
ExecReload=/bin/kill -HUP $MAINPID
Restart=on-failure
RestartSec=10s
LimitNOFILE=infinity

[Install]
WantedBy=multi-user.target
",
        binary = binary.display(),
        config = config.display(),
    )
}

/// Writes the unit file, then reloads systemd and (re)starts the service.
pub async fn install_service(
    runner: &dyn Runner,
    unit: &Path,
    binary: &Path,
    config: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = unit.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    tokio::fs::write(unit, render_unit(binary, config))
        .await
        .map_err(|e| Error::io(unit, e))?;
    log::info!("unit written to {}", unit.display());

    let steps: [&[&str]; 3] = [
        &["daemon-reload"],
        &["enable", SERVICE_NAME],
        &["restart", SERVICE_NAME],
    ];
    for args in steps {
        runner
            .run("systemctl", args)
            .await
            .map_err(|e| Error::Service(e.to_string()))?;
    }
    log::info!("{SERVICE_NAME} service started");
    Ok(())
}
