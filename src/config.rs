use crate::llm::{LlmProtocol, LlmSettings};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variables consulted for the model API key, in order.
pub const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "API_KEY", "LLM_API_KEY"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// MCP seed file (`mcp.json` layout); demo servers are used when unset
    #[arg(long, env = "MCP_CONFIG")]
    pub mcp_config: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub mcp: McpSeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub protocol: LlmProtocol,
    pub temperature: f32,
    /// Zero disables the thinking config.
    pub thinking_budget: u32,
    pub timeout_secs: u64,
    pub send_history: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct McpSeedConfig {
    #[serde(default)]
    pub config_file: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layered load. Priority: CLI flag > `NEXUS_` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("llm.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("llm.model", "gemini-2.5-flash")?
            .set_default("llm.protocol", "auto")?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.thinking_budget", 2048)?
            .set_default("llm.timeout_secs", 60)?
            .set_default("llm.send_history", true)?;

        // Explicit file must exist; ./config.yaml is picked up only if present.
        match &cli.config {
            Some(path) => {
                builder = builder.add_source(File::with_name(path).required(true));
            }
            None if Path::new("config.yaml").exists() => {
                builder = builder.add_source(File::with_name("config.yaml").required(false));
            }
            None => {}
        }

        // E.g. NEXUS_SERVER__PORT=8000, NEXUS_LLM__MODEL=gemini-2.5-pro
        builder = builder.add_source(
            Environment::with_prefix("NEXUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(path) = cli.mcp_config {
            builder = builder.set_override("mcp.config_file", path)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Model settings with the API key taken from the environment.
    pub fn llm_settings(&self) -> LlmSettings {
        let llm = &self.llm;
        LlmSettings {
            base_url: llm.base_url.clone(),
            api_key: api_key_from_env(),
            model: llm.model.clone(),
            protocol: llm.protocol,
            temperature: llm.temperature,
            thinking_budget: (llm.thinking_budget > 0).then_some(llm.thinking_budget),
            timeout: Duration::from_secs(llm.timeout_secs),
            send_history: llm.send_history,
        }
    }
}

/// First non-blank key among [`API_KEY_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}
