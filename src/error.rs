//! Typed errors for the registry, the conversation log and the LLM boundary.

use thiserror::Error;

/// Failures talking to the hosted language model.
///
/// None of these reach the chat caller: the orchestrator logs them and
/// answers with the fallback reply instead.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured; detected before any network I/O.
    #[error("API key missing")]
    MissingCredential,

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Rejected registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server name is required")]
    EmptyName,

    #[error("server url is required")]
    EmptyUrl,
}

/// Rejected chat submissions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyPrompt,

    /// Another turn is still waiting on the orchestrator.
    #[error("a response is already pending")]
    Busy,

    #[error("turn ended without a reply")]
    Aborted,
}
