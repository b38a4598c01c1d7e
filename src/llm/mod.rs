//! LLM driver traits and implementations.
//!
//! This module wraps the hosted language model behind a single
//! request/response boundary. The orchestrator composes an [`LlmRequest`],
//! hands it to an [`LlmDriver`], and gets back plain text plus any function
//! calls the model proposed.
//!
//! # Drivers
//!
//! - [`GeminiDriver`]: Gemini `generateContent` (`/v1beta/models/{model}:generateContent`)
//! - [`ChatCompletionsDriver`]: OpenAI-compatible Chat Completions (`/v1/chat/completions`)
//!
//! # Example
//!
//! ```rust,ignore
//! use nexus_orchestrator::llm::{LlmSettings, LlmProtocol, Orchestrator};
//!
//! let settings = LlmSettings {
//!     base_url: "https://generativelanguage.googleapis.com".to_string(),
//!     api_key: Some("...".to_string()),
//!     model: "gemini-2.5-flash".to_string(),
//!     protocol: LlmProtocol::Auto,
//!     ..LlmSettings::default()
//! };
//! let orchestrator = Orchestrator::new(settings);
//! ```

pub mod chat_completions;
pub mod gemini;
pub mod orchestrator;
pub mod prompt;

pub use chat_completions::ChatCompletionsDriver;
pub use gemini::GeminiDriver;
pub use orchestrator::{FALLBACK_REPLY, Orchestrator, Reply};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://generativelanguage.googleapis.com`).
    pub base_url: String,
    /// API key. `None` makes every turn fail fast with the fallback reply.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gemini-2.5-flash`).
    pub model: String,
    /// Protocol to use for communication.
    pub protocol: LlmProtocol,
    /// Sampling temperature sent with every request.
    pub temperature: f32,
    /// Reasoning budget in tokens; `None` omits the thinking config.
    pub thinking_budget: Option<u32>,
    /// Upper bound for a single outbound request.
    pub timeout: Duration,
    /// Whether prior turns are sent along with the prompt.
    pub send_history: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            protocol: LlmProtocol::Auto,
            temperature: 0.7,
            thinking_budget: Some(2048),
            timeout: Duration::from_secs(60),
            send_history: true,
        }
    }
}

// The API key stays out of logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("protocol", &self.protocol)
            .field("temperature", &self.temperature)
            .field("thinking_budget", &self.thinking_budget)
            .field("timeout", &self.timeout)
            .field("send_history", &self.send_history)
            .finish()
    }
}

/// LLM protocol variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProtocol {
    /// Detect from the base URL.
    #[default]
    Auto,
    /// Gemini `generateContent`.
    Gemini,
    /// `OpenAI` Chat Completions.
    Chat,
}

impl LlmProtocol {
    /// Resolve `Auto` against a base URL.
    #[must_use]
    pub fn resolve(self, base_url: &str) -> Self {
        match self {
            Self::Auto if base_url.to_lowercase().contains("generativelanguage.googleapis.com") => {
                Self::Gemini
            }
            Self::Auto => Self::Chat,
            other => other,
        }
    }
}

/// Speaker of a prior conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One prior turn handed to the backend as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub text: String,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Parameter types understood by the function-declaration schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
}

/// One declared function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// A callable function advertised to the model.
///
/// Drivers render this into their own wire schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<FunctionParam>,
}

impl FunctionDeclaration {
    pub fn required(&self) -> Vec<&'static str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect()
    }
}

/// A function call proposed by the model, relayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInvocation {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Request to an LLM driver.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_instruction: String,
    /// Prior turns, oldest first. Empty when history is disabled.
    pub history: Vec<HistoryTurn>,
    /// The user's current message.
    pub prompt: String,
    pub tools: Vec<FunctionDeclaration>,
    pub temperature: f32,
    pub thinking_budget: Option<u32>,
}

/// Parsed model output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub function_calls: Vec<ToolCallInvocation>,
}

/// A single-shot connection to a hosted model.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Send one request and wait for the complete reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that does not match the expected response shape.
    async fn generate(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// Shared HTTP client with the configured request timeout.
///
/// Drivers also set the timeout per request, so the bound holds on the
/// default client too.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}
