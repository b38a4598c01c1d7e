//! LLM orchestrator for a single conversational turn.
//!
//! The orchestrator:
//! 1. Summarizes the connected MCP servers into a system instruction
//! 2. Advertises the `execute_mcp_tool` router function
//! 3. Sends the prompt (plus prior turns) to the configured driver
//! 4. Relays the reply text and any proposed tool calls
//!
//! Proposed tool calls are never dispatched. Every failure collapses into
//! [`FALLBACK_REPLY`] so the conversation always gets an answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexus_orchestrator::llm::{LlmSettings, Orchestrator};
//! use nexus_orchestrator::mcp::ServerRegistry;
//!
//! let orchestrator = Orchestrator::new(LlmSettings::default());
//! let servers = ServerRegistry::demo().list();
//! let reply = orchestrator.converse("Open a ticket for the login bug", &[], &servers).await;
//! ```

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::LlmError;
use crate::mcp::ServerRecord;

use super::prompt::{router_tool_declaration, system_preamble};
use super::{
    ChatCompletionsDriver, GeminiDriver, HistoryTurn, LlmDriver, LlmProtocol, LlmRequest,
    LlmSettings, ToolCallInvocation,
};

/// Reply used whenever the backend cannot be reached or understood.
pub const FALLBACK_REPLY: &str = "I encountered a critical error connecting to the neural core. Please check your API key and network connection.";

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub tool_calls: Vec<ToolCallInvocation>,
}

impl Reply {
    /// The fixed reply for any failed turn.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            tool_calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.text == FALLBACK_REPLY && self.tool_calls.is_empty()
    }
}

/// Composes requests for the hosted model and relays its replies.
#[derive(Clone)]
pub struct Orchestrator {
    settings: LlmSettings,
    driver: Arc<dyn LlmDriver>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("driver", &"LlmDriver")
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the driver matching `settings.protocol`.
    pub fn new(settings: LlmSettings) -> Self {
        let driver: Arc<dyn LlmDriver> = match settings.protocol.resolve(&settings.base_url) {
            LlmProtocol::Chat => Arc::new(ChatCompletionsDriver::new(settings.clone())),
            LlmProtocol::Gemini | LlmProtocol::Auto => {
                Arc::new(GeminiDriver::new(settings.clone()))
            }
        };
        Self::with_driver(settings, driver)
    }

    /// Create an orchestrator around an existing driver.
    pub fn with_driver(settings: LlmSettings, driver: Arc<dyn LlmDriver>) -> Self {
        Self { settings, driver }
    }

    /// Get the LLM settings.
    #[must_use]
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Run one turn against the model.
    ///
    /// Never fails: missing credentials, transport errors, bad statuses and
    /// malformed payloads are logged and answered with [`Reply::fallback`].
    pub async fn converse(
        &self,
        prompt: &str,
        history: &[HistoryTurn],
        servers: &[ServerRecord],
    ) -> Reply {
        let request_id = Uuid::new_v4().to_string();

        match self.try_converse(&request_id, prompt, history, servers).await {
            Ok(reply) => {
                tracing::info!(
                    request_id = %request_id,
                    text_length = reply.text.len(),
                    tool_call_count = reply.tool_calls.len(),
                    "Orchestrator turn completed"
                );
                reply
            }
            Err(LlmError::MissingCredential) => {
                tracing::error!(request_id = %request_id, "API key missing; skipping model call");
                Reply::fallback()
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Model call failed");
                Reply::fallback()
            }
        }
    }

    async fn try_converse(
        &self,
        request_id: &str,
        prompt: &str,
        history: &[HistoryTurn],
        servers: &[ServerRecord],
    ) -> Result<Reply, LlmError> {
        if self
            .settings
            .api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            return Err(LlmError::MissingCredential);
        }

        let history = if self.settings.send_history {
            history.to_vec()
        } else {
            Vec::new()
        };

        let req = LlmRequest {
            system_instruction: system_preamble(servers),
            history,
            prompt: prompt.to_string(),
            tools: vec![router_tool_declaration()],
            temperature: self.settings.temperature,
            thinking_budget: self.settings.thinking_budget,
        };

        tracing::info!(
            request_id = %request_id,
            model = %self.settings.model,
            server_count = servers.len(),
            history_len = req.history.len(),
            "Starting orchestrator turn"
        );
        tracing::debug!(
            request_id = %request_id,
            system_instruction = %req.system_instruction,
            "System instruction"
        );

        let resp = self.driver.generate(req).await?;

        for call in &resp.function_calls {
            tracing::info!(
                request_id = %request_id,
                tool_name = %call.name,
                arg_count = call.args.len(),
                "Model proposed tool call"
            );
        }

        Ok(Reply {
            text: resp.text,
            tool_calls: resp.function_calls,
        })
    }
}
