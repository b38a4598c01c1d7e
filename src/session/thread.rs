//! Conversation log and the single pending turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;
use crate::llm::{FALLBACK_REPLY, HistoryTurn, Reply, ToolCallInvocation};

/// Greeting the agent opens every conversation with.
pub const WELCOME_MESSAGE: &str = "Nexus Orchestrator online. I have access to your connected MCP servers. How can I assist you today?";

/// Text for a turn whose orchestration task aborted before replying.
pub const LOST_CONNECTION_REPLY: &str =
    "I lost connection to the orchestration layer. Please check your API key.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Success,
    Error,
}

/// A tool call as shown in the message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub status: ToolCallStatus,
}

impl ToolCallRecord {
    /// Calls are simulated, so every relayed invocation is logged as a success.
    pub fn from_invocation(call: ToolCallInvocation) -> Self {
        Self {
            tool_name: call.name,
            args: call.args,
            result: None,
            status: ToolCallStatus::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: SenderType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_thinking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,
}

impl ChatMessage {
    fn new(sender: SenderType, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            is_thinking: false,
            tool_calls: None,
        }
    }
}

/// Lifecycle of one turn: `Idle -> Sending -> {Completed | Failed} -> Idle`.
///
/// `Completed` and `Failed` are transient; the conversation returns to `Idle`
/// as soon as the placeholder has been finalized, so only the last outcome
/// is kept in [`Conversation::last_outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    Idle,
    Sending,
    Completed,
    Failed,
}

/// Handle for the turn currently waiting on the orchestrator.
#[derive(Debug)]
pub struct PendingTurn {
    placeholder_id: String,
    prompt: String,
    history: Vec<HistoryTurn>,
}

impl PendingTurn {
    pub fn placeholder_id(&self) -> &str {
        &self.placeholder_id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Turns that preceded this prompt, oldest first.
    pub fn history(&self) -> &[HistoryTurn] {
        &self.history
    }
}

/// Append-only message log with at most one pending agent placeholder.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    state: TurnState,
    last_outcome: Option<TurnState>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Start a conversation with the agent's welcome message.
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::new(SenderType::Agent, WELCOME_MESSAGE)],
            state: TurnState::Idle,
            last_outcome: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<TurnState> {
        self.last_outcome
    }

    pub fn is_processing(&self) -> bool {
        self.state == TurnState::Sending
    }

    /// Prior turns as the backend sees them. Pending and empty messages are
    /// skipped; agent and system messages both speak as the model.
    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .filter(|m| !m.is_thinking && !m.text.is_empty())
            .map(|m| match m.sender {
                SenderType::User => HistoryTurn::user(m.text.clone()),
                SenderType::Agent | SenderType::System => HistoryTurn::model(m.text.clone()),
            })
            .collect()
    }

    /// Append the user's message and a pending agent placeholder.
    ///
    /// Rejected without touching the log if the text is blank or another turn
    /// is still pending.
    pub fn begin_turn(&mut self, text: &str) -> Result<PendingTurn, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        if self.is_processing() {
            return Err(ChatError::Busy);
        }

        let history = self.history();
        self.messages.push(ChatMessage::new(SenderType::User, text));

        let mut placeholder = ChatMessage::new(SenderType::Agent, "");
        placeholder.is_thinking = true;
        let placeholder_id = placeholder.id.clone();
        self.messages.push(placeholder);
        self.state = TurnState::Sending;

        tracing::debug!(placeholder_id = %placeholder_id, "Turn started");

        Ok(PendingTurn {
            placeholder_id,
            prompt: text.to_string(),
            history,
        })
    }

    /// Replace the pending placeholder with the orchestrator's reply.
    pub fn complete_turn(&mut self, turn: &PendingTurn, reply: Reply) -> Option<&ChatMessage> {
        let outcome = if reply.text == FALLBACK_REPLY {
            TurnState::Failed
        } else {
            TurnState::Completed
        };
        let tool_calls: Vec<ToolCallRecord> = reply
            .tool_calls
            .into_iter()
            .map(ToolCallRecord::from_invocation)
            .collect();
        let tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);

        self.finalize(turn, reply.text, tool_calls, outcome)
    }

    /// Finalize the placeholder when the orchestration task itself died.
    pub fn fail_turn(&mut self, turn: &PendingTurn) -> Option<&ChatMessage> {
        self.finalize(
            turn,
            LOST_CONNECTION_REPLY.to_string(),
            None,
            TurnState::Failed,
        )
    }

    fn finalize(
        &mut self,
        turn: &PendingTurn,
        text: String,
        tool_calls: Option<Vec<ToolCallRecord>>,
        outcome: TurnState,
    ) -> Option<&ChatMessage> {
        let Some(idx) = self
            .messages
            .iter()
            .position(|m| m.id == turn.placeholder_id && m.is_thinking)
        else {
            tracing::warn!(placeholder_id = %turn.placeholder_id, "No pending placeholder to finalize");
            return None;
        };

        let msg = &mut self.messages[idx];
        msg.text = text;
        msg.is_thinking = false;
        msg.tool_calls = tool_calls;

        self.last_outcome = Some(outcome);
        self.state = TurnState::Idle;

        tracing::debug!(placeholder_id = %turn.placeholder_id, outcome = ?outcome, "Turn finalized");
        Some(&self.messages[idx])
    }
}
