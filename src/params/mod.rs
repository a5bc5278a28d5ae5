mod menu;
mod password;

pub use menu::{select_method, select_obfuscation, MenuPick, METHOD_MENU, OBFS_MENU};
pub use password::{generate_password, PASSWORD_LEN};

use serde::{Deserialize, Serialize};
use std::{net::IpAddr, str::FromStr};

use crate::error::Error;

pub const DEFAULT_OBFS_HOST: &str = "www.speedtest.cn";
pub const DEFAULT_NODE_NAME: &str = "SingBox_Server_Auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    #[serde(rename = "2022-blake3-aes-128-gcm")]
    Blake3Aes128Gcm,
    #[serde(rename = "2022-blake3-aes-256-gcm")]
    Blake3Aes256Gcm,
    #[serde(rename = "2022-blake3-chacha20-poly1305")]
    Blake3Chacha20Poly1305,
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-ietf-poly1305")]
    Chacha20IetfPoly1305,
}

impl Method {
    /// Menu order, index 0 is menu entry 1.
    pub const ALL: [Method; 6] = [
        Method::Blake3Aes128Gcm,
        Method::Blake3Aes256Gcm,
        Method::Blake3Chacha20Poly1305,
        Method::Aes128Gcm,
        Method::Aes256Gcm,
        Method::Chacha20IetfPoly1305,
    ];

    /// The 2022 AEAD family, whose servers expect the password to be a
    /// base64 key of exactly 16 or 32 bytes.
    pub fn needs_raw_key(&self) -> bool {
        matches!(
            self,
            Method::Blake3Aes128Gcm | Method::Blake3Aes256Gcm | Method::Blake3Chacha20Poly1305
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Blake3Aes128Gcm => "2022-blake3-aes-128-gcm",
            Method::Blake3Aes256Gcm => "2022-blake3-aes-256-gcm",
            Method::Blake3Chacha20Poly1305 => "2022-blake3-chacha20-poly1305",
            Method::Aes128Gcm => "aes-128-gcm",
            Method::Aes256Gcm => "aes-256-gcm",
            Method::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or(anyhow::anyhow!("Not support method: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObfsMode {
    Http,
    Tls,
}

impl ObfsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObfsMode::Http => "http",
            ObfsMode::Tls => "tls",
        }
    }

    /// `none` parses to `Ok(None)`.
    pub fn parse_setting(s: &str) -> anyhow::Result<Option<Self>> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "none" => None,
            "http" => Some(ObfsMode::Http),
            "tls" => Some(ObfsMode::Tls),
            other => anyhow::bail!("Not support obfs mode: {other}"),
        })
    }
}

impl std::fmt::Display for ObfsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured obfuscation wrapper. The host only exists together with a mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obfs {
    pub mode: ObfsMode,
    pub host: String,
}

impl Obfs {
    pub fn new(mode: ObfsMode, host: &str) -> Self {
        let host = host.trim();
        let host = if host.is_empty() { DEFAULT_OBFS_HOST } else { host };
        Self {
            mode,
            host: host.to_string(),
        }
    }
}

/// Everything one run derives. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParams {
    pub port: u16,
    pub password: String,
    pub method: Method,
    pub obfs: Option<Obfs>,
    pub server_address: String,
    pub node_name: String,
}

impl ServerParams {
    /// Host part as it appears in `host:port`; IPv6 literals get brackets.
    pub fn host_for_uri(&self) -> String {
        match self.server_address.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
            _ => self.server_address.clone(),
        }
    }
}

pub fn validate_port(text: &str) -> anyhow::Result<u16> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::validation("port", "a port is required").into());
    }
    let port: u32 = text
        .parse()
        .map_err(|_| Error::validation("port", format!("{text:?} is not a number")))?;
    match u16::try_from(port) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::validation("port", format!("{port} is outside 1-65535")).into()),
    }
}

pub fn validate_server_address(text: &str) -> anyhow::Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::validation("server address", "a server address is required").into());
    }
    let text = text.trim_start_matches('[').trim_end_matches(']');
    if text.parse::<IpAddr>().is_ok() {
        return Ok(text.to_string());
    }
    let hostname = text
        .split('.')
        .all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if !hostname || text.len() > 253 {
        return Err(Error::validation("server address", format!("{text:?} is not an IP address or hostname")).into());
    }
    Ok(text.to_string())
}

pub fn validate_node_name(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        DEFAULT_NODE_NAME.to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn port_bounds() {
        assert_eq!(validate_port("8443").unwrap(), 8443);
        assert_eq!(validate_port(" 1 ").unwrap(), 1);
        assert_eq!(validate_port("65535").unwrap(), 65535);
        for bad in ["0", "70000", "", "  ", "-1", "80a"] {
            let err = validate_port(bad).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<Error>(), Some(Error::Validation { field: "port", .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn server_address() {
        assert_eq!(validate_server_address("203.0.113.5").unwrap(), "203.0.113.5");
        assert_eq!(validate_server_address("[2001:db8::1]").unwrap(), "2001:db8::1");
        assert_eq!(validate_server_address("relay.example.com").unwrap(), "relay.example.com");
        assert!(validate_server_address("").is_err());
        assert!(validate_server_address("bad host").is_err());
        assert!(validate_server_address("a@b").is_err());
    }

    #[test]
    fn raw_key_methods() {
        for method in Method::ALL {
            assert_eq!(method.needs_raw_key(), method.as_str().starts_with("2022-"), "{method}");
        }
        assert!(Method::default().needs_raw_key());
    }

    #[test]
    fn method_names() -> anyhow::Result<()> {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>()?, method);
            assert_eq!(serde_json::to_string(&method)?, format!("\"{method}\""));
        }
        assert_eq!("AES-256-GCM".parse::<Method>()?, Method::Aes256Gcm);
        assert!("rc4-md5".parse::<Method>().is_err());
        Ok(())
    }

    #[test]
    fn obfs_host_defaults() {
        assert_eq!(Obfs::new(ObfsMode::Tls, "  ").host, DEFAULT_OBFS_HOST);
        assert_eq!(Obfs::new(ObfsMode::Http, "www.bing.com").host, "www.bing.com");
        assert_eq!(ObfsMode::parse_setting("NONE").unwrap(), None);
        assert_eq!(ObfsMode::parse_setting("tls").unwrap(), Some(ObfsMode::Tls));
        assert!(ObfsMode::parse_setting("websocket").is_err());
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let params = ServerParams {
            port: 443,
            password: "p".into(),
            method: Method::default(),
            obfs: None,
            server_address: "2001:db8::1".into(),
            node_name: DEFAULT_NODE_NAME.into(),
        };
        assert_eq!(params.host_for_uri(), "[2001:db8::1]");
    }
}
