//! Nexus Orchestrator
//!
//! A chat backend where a hosted language model acts as an orchestrator over
//! a registry of (simulated) MCP servers. The model can answer directly or
//! propose an `execute_mcp_tool` call; proposals are relayed for display and
//! never dispatched.
//!
//! # Architecture
//!
//! - **Server**: Axum-based JSON API for chat and server management
//! - **LLM Orchestration**: one request/response turn against Gemini or any
//!   OpenAI-compatible Chat Completions endpoint
//! - **MCP Registry**: in-memory server records seeded from demo data or `mcp.json`
//! - **Session**: append-only message log with a single pending turn
//!
//! # Modules
//!
//! - [`llm`]: drivers, prompt composition and the orchestrator
//! - [`mcp`]: server records and the registry
//! - [`session`]: conversation log and turn lifecycle
//! - [`server`]: HTTP routes

#![allow(clippy::missing_fields_in_debug)]

pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod server;
pub mod session;

use std::sync::Arc;

use tokio::sync::RwLock;

use error::ChatError;
use llm::Orchestrator;
use mcp::ServerRegistry;
use session::{ChatMessage, Conversation};

/// Application state shared across all handlers.
///
/// Locks are only held for synchronous bookkeeping, never across the model
/// call; single-flight comes from the conversation's pending placeholder.
#[derive(Clone, Debug)]
pub struct AppState {
    /// MCP server records shown to the model.
    pub registry: Arc<RwLock<ServerRegistry>>,
    /// Message log.
    pub conversation: Arc<RwLock<Conversation>>,
    /// LLM orchestrator for chat interactions.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(registry: ServerRegistry, orchestrator: Orchestrator) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            conversation: Arc::new(RwLock::new(Conversation::new())),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Run one full turn and return the finalized agent message.
    ///
    /// The turn runs on its own task so the placeholder is finalized even if
    /// the caller goes away. A panic inside the model call finalizes it with
    /// the lost-connection reply instead.
    pub async fn submit(&self, text: &str) -> Result<ChatMessage, ChatError> {
        let turn = self.conversation.write().await.begin_turn(text)?;
        let servers = self.registry.read().await.list();

        let orchestrator = Arc::clone(&self.orchestrator);
        let conversation = Arc::clone(&self.conversation);

        let task = tokio::spawn(async move {
            let prompt = turn.prompt().to_string();
            let history = turn.history().to_vec();
            let call = tokio::spawn(async move {
                orchestrator.converse(&prompt, &history, &servers).await
            });

            let result = call.await;
            let mut conversation = conversation.write().await;
            match result {
                Ok(reply) => conversation.complete_turn(&turn, reply).cloned(),
                Err(e) => {
                    tracing::error!(error = %e, placeholder_id = %turn.placeholder_id(), "Orchestrator task aborted");
                    conversation.fail_turn(&turn).cloned()
                }
            }
        });

        match task.await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(ChatError::Aborted),
            Err(e) => {
                tracing::error!(error = %e, "Turn task aborted");
                Err(ChatError::Aborted)
            }
        }
    }
}
