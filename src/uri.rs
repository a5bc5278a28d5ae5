//! `ss://` share links.
//!
//! Layout: `ss://<base64(method:password@host:port)>[;plugin=obfs;obfs-mode=M;obfs-host=H]#<name>`.
//! The plugin fragment stays in cleartext after the base64 segment, which is
//! what older client parsers expect.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::borrow::Cow;

use crate::params::{Method, Obfs, ObfsMode, ServerParams};

pub const SCHEME: &str = "ss://";

/// Percent-encodes everything outside `A-Z a-z 0-9 - _ . ~`; space becomes `%20`.
pub fn url_encode(s: &str) -> Cow<'_, str> {
    urlencoding::encode(s)
}

pub fn url_decode(s: &str) -> anyhow::Result<String> {
    Ok(urlencoding::decode(s)?.into_owned())
}

pub fn credentials(params: &ServerParams) -> String {
    format!(
        "{}:{}@{}:{}",
        params.method,
        params.password,
        params.host_for_uri(),
        params.port
    )
}

pub fn encode_uri(params: &ServerParams) -> String {
    let mut uri = String::from(SCHEME);
    uri.push_str(&STANDARD.encode(credentials(params)));
    if let Some(ref obfs) = params.obfs {
        uri.push_str(&format!(
            ";plugin=obfs;obfs-mode={};obfs-host={}",
            obfs.mode,
            url_encode(&obfs.host)
        ));
    }
    uri.push('#');
    uri.push_str(&url_encode(&params.node_name));
    uri
}

/// A parsed share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub method: Method,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub obfs: Option<Obfs>,
    pub name: Option<String>,
}

impl ShareLink {
    pub fn parse(uri: &str) -> anyhow::Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix(SCHEME)
            .ok_or(anyhow::anyhow!("share link must start with {SCHEME}"))?;

        let (rest, name) = match rest.split_once('#') {
            Some((rest, name)) => (rest, Some(url_decode(name)?)),
            None => (rest, None),
        };

        let mut parts = rest.split(';');
        let encoded = parts.next().unwrap_or_default();
        let obfs = parse_plugin(parts)?;

        let decoded = STANDARD
            .decode(encoded)
            .context("credential segment is not base64")?;
        let decoded = String::from_utf8(decoded)?;

        // Password is base64 and cannot hold '@', host may be an IPv6 literal.
        let (userinfo, hostport) = decoded
            .rsplit_once('@')
            .ok_or(anyhow::anyhow!("missing '@' in {decoded:?}"))?;
        let (method, password) = userinfo
            .split_once(':')
            .ok_or(anyhow::anyhow!("missing ':' in {userinfo:?}"))?;
        let (host, port) = hostport
            .rsplit_once(':')
            .ok_or(anyhow::anyhow!("missing port in {hostport:?}"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok(Self {
            method: method.parse()?,
            password: password.to_string(),
            host: host.to_string(),
            port: port.parse()?,
            obfs,
            name,
        })
    }
}

fn parse_plugin<'a>(parts: impl Iterator<Item = &'a str>) -> anyhow::Result<Option<Obfs>> {
    let mut plugin = None;
    let mut mode = None;
    let mut host = None;
    for part in parts {
        let (key, value) = part
            .split_once('=')
            .ok_or(anyhow::anyhow!("malformed plugin option {part:?}"))?;
        match key {
            "plugin" => plugin = Some(value),
            "obfs-mode" => mode = ObfsMode::parse_setting(value)?,
            "obfs-host" => host = Some(url_decode(value)?),
            _ => log::warn!("ignoring plugin option {key}"),
        }
    }
    match (plugin, mode) {
        (None, _) => Ok(None),
        (Some("obfs"), Some(mode)) => Ok(Some(Obfs::new(mode, host.as_deref().unwrap_or_default()))),
        (Some("obfs"), None) => anyhow::bail!("obfs plugin without obfs-mode"),
        (Some(other), _) => anyhow::bail!("Not support plugin: {other}"),
    }
}
