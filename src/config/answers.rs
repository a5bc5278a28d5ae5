use serde::{Deserialize, Serialize};

/// Prompt answers given ahead of time. A present field skips its prompt.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Answers {
    pub port: Option<u32>,
    pub method: Option<String>,
    pub obfs: Option<String>,
    pub obfs_host: Option<String>,
    pub node_name: Option<String>,
    pub server_address: Option<String>,
}
