use serde::Deserialize;
use std::{net::IpAddr, path::Path, time::Duration};

use crate::error::Error;

/// HTTP collaborator. Everything the installer asks the network for goes
/// through here so the pipeline can be driven without sockets.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    async fn text(&self, url: &str) -> anyhow::Result<String>;
    async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
    async fn text(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Network(format!("{url}: HTTP {}", response.status())).into());
        }
        Ok(response
            .text()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?)
    }

    async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        log::info!("downloading {url}");
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(300))
            .send()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Network(format!("{url}: HTTP {}", response.status())).into());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| Error::io(dest, e))?;
        log::info!("downloaded {} bytes", bytes.len());
        Ok(())
    }
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: String,
}

pub fn latest_release_url(repo: &str) -> String {
    format!("https://api.github.com/repos/{repo}/releases/latest")
}

/// Latest release version of `repo`, without the leading `v`.
pub async fn latest_version(fetch: &dyn Fetch, repo: &str) -> anyhow::Result<String> {
    let body = fetch.text(&latest_release_url(repo)).await?;
    let release: LatestRelease = serde_json::from_str(&body)
        .map_err(|e| Error::Network(format!("unexpected release response: {e}")))?;
    let version = release.tag_name.trim().trim_start_matches('v');
    if version.is_empty() {
        return Err(Error::Network("release has an empty tag".to_string()).into());
    }
    Ok(version.to_string())
}

/// Asks each endpoint in order; the first answer that is an IP address wins.
pub async fn detect_public_ip(fetch: &dyn Fetch, endpoints: &[String]) -> Option<IpAddr> {
    for endpoint in endpoints {
        match fetch.text(endpoint).await {
            Ok(body) => match body.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    log::info!("public address {ip} from {endpoint}");
                    return Some(ip);
                }
                Err(_) => log::warn!("{endpoint} returned {:?}, not an address", body.trim()),
            },
            Err(err) => log::warn!("ip lookup failed: {err}"),
        }
    }
    None
}
