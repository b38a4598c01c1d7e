use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

use super::types::ServerStatus;

/// Seed file for the server registry (`mcp.json`).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, McpServerEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct McpServerEntry {
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default)]
    pub tools_count: u32,
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> anyhow::Result<McpConfig> {
    let txt = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&txt)?)
}

/// Expand "${VAR}" placeholders from the process environment.
/// Missing variables leave the placeholder unchanged.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = input.to_string();
    for (k, v) in std::env::vars() {
        let needle = format!("${{{k}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, &v);
        }
    }
    out
}
