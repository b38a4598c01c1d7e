//! Conversation state for the chat surface.
//!
//! The log is append-only. A submitted turn adds the user's message and an
//! agent placeholder marked `is_thinking`; once the orchestrator answers, that
//! placeholder is rewritten in place exactly once. Only one placeholder may be
//! pending at a time, so a second submission while a turn is in flight is
//! rejected rather than queued.
//!
//! # Example
//!
//! ```rust
//! use nexus_orchestrator::llm::Reply;
//! use nexus_orchestrator::session::Conversation;
//!
//! let mut conversation = Conversation::new();
//! let turn = conversation.begin_turn("Hello!").unwrap();
//! assert!(conversation.begin_turn("Again").is_err());
//!
//! conversation.complete_turn(&turn, Reply::fallback());
//! assert_eq!(conversation.messages().len(), 3);
//! ```

mod thread;

pub use thread::{
    ChatMessage, Conversation, LOST_CONNECTION_REPLY, PendingTurn, SenderType, ToolCallRecord,
    ToolCallStatus, TurnState, WELCOME_MESSAGE,
};
