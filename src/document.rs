use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::params::{Method, Obfs, ServerParams};

pub const INBOUND_TAG: &str = "ss-in";
pub const DIRECT_TAG: &str = "direct";
pub const BLOCK_TAG: &str = "block";

/// The sing-box configuration written for the relay. Field order here is the
/// key order in the emitted JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub log: Log,
    pub dns: Dns,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub level: String,
    pub timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dns {
    pub servers: Vec<DnsServer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsServer {
    pub tag: String,
    pub address: String,
    pub detour: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    pub method: Method,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Obfs>,
    pub udp_over_tcp: bool,
    pub multiplex: Multiplex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiplex {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub rules: Vec<RouteRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    pub inbound: Vec<String>,
    pub outbound: String,
}

fn outbound(tag: &str) -> Outbound {
    Outbound {
        kind: tag.to_string(),
        tag: tag.to_string(),
    }
}

fn resolver(tag: &str, address: &str) -> DnsServer {
    DnsServer {
        tag: tag.to_string(),
        address: address.to_string(),
        detour: DIRECT_TAG.to_string(),
    }
}

pub fn build_server_config(params: &ServerParams) -> ConfigDocument {
    ConfigDocument {
        log: Log {
            level: "info".to_string(),
            timestamp: true,
        },
        dns: Dns {
            servers: vec![resolver("google", "8.8.8.8"), resolver("cloudflare", "1.1.1.1")],
        },
        inbounds: vec![Inbound {
            kind: "shadowsocks".to_string(),
            tag: INBOUND_TAG.to_string(),
            listen: "0.0.0.0".to_string(),
            listen_port: params.port,
            method: params.method,
            password: params.password.clone(),
            obfs: params.obfs.clone(),
            udp_over_tcp: true,
            multiplex: Multiplex { enabled: true },
        }],
        outbounds: vec![outbound(DIRECT_TAG), outbound(BLOCK_TAG)],
        route: Route {
            rules: vec![RouteRule {
                inbound: vec![INBOUND_TAG.to_string()],
                outbound: DIRECT_TAG.to_string(),
            }],
        },
    }
}

impl ConfigDocument {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document, creating the parent directory first.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| Error::io(path, e))?;
        log::info!("config written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::{ObfsMode, DEFAULT_NODE_NAME};

    fn make_params(obfs: Option<Obfs>) -> ServerParams {
        ServerParams {
            port: 8443,
            password: "abcdEFGH12345678".to_string(),
            method: Method::Blake3Aes128Gcm,
            obfs,
            server_address: "203.0.113.5".to_string(),
            node_name: DEFAULT_NODE_NAME.to_string(),
        }
    }

    #[test]
    fn obfs_block_follows_params() -> anyhow::Result<()> {
        let with = build_server_config(&make_params(Some(Obfs::new(ObfsMode::Http, "www.bing.com"))));
        let value: serde_json::Value = serde_json::from_str(&with.to_json()?)?;
        let inbound = &value["inbounds"][0];
        assert_eq!(inbound["obfs"]["mode"], "http");
        assert_eq!(inbound["obfs"]["host"], "www.bing.com");

        let without = build_server_config(&make_params(None));
        let value: serde_json::Value = serde_json::from_str(&without.to_json()?)?;
        assert!(value["inbounds"][0].get("obfs").is_none());
        Ok(())
    }

    #[test]
    fn document_shape() -> anyhow::Result<()> {
        let params = make_params(None);
        let value: serde_json::Value = serde_json::to_value(build_server_config(&params))?;

        let inbound = &value["inbounds"][0];
        assert_eq!(inbound["type"], "shadowsocks");
        assert_eq!(inbound["listen"], "0.0.0.0");
        assert_eq!(inbound["listen_port"], 8443);
        assert_eq!(inbound["method"], "2022-blake3-aes-128-gcm");
        assert_eq!(inbound["password"], params.password.as_str());
        assert_eq!(inbound["udp_over_tcp"], true);
        assert_eq!(inbound["multiplex"]["enabled"], true);

        assert_eq!(value["outbounds"][0]["tag"], "direct");
        assert_eq!(value["outbounds"][1]["type"], "block");
        assert_eq!(value["route"]["rules"][0]["inbound"][0], INBOUND_TAG);
        assert_eq!(value["route"]["rules"][0]["outbound"], "direct");

        let servers = value["dns"]["servers"].as_array().unwrap();
        assert_eq!(servers.len(), 2);
        assert!(servers.iter().all(|s| s["detour"] == "direct"));
        Ok(())
    }

    #[test]
    fn user_strings_are_escaped() -> anyhow::Result<()> {
        let doc = build_server_config(&make_params(Some(Obfs::new(ObfsMode::Tls, "evil\",\"x\":\"y"))));
        let parsed: ConfigDocument = serde_json::from_str(&doc.to_json()?)?;
        assert_eq!(parsed, doc);
        Ok(())
    }

    #[tokio::test]
    async fn write_creates_parent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sing-box").join("config.json");
        let doc = build_server_config(&make_params(None));
        doc.write_to(&path).await?;
        let content = tokio::fs::read_to_string(&path).await?;
        assert_eq!(serde_json::from_str::<ConfigDocument>(&content)?, doc);
        Ok(())
    }

    #[tokio::test]
    async fn write_failure_is_io_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, b"x").await?;
        let err = build_server_config(&make_params(None))
            .write_to(blocker.join("config.json"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Io { .. })));
        Ok(())
    }
}
