use serde::{Deserialize, Serialize};

/// Connection state of a registered MCP server.
///
/// `Error` and `Connecting` are part of the wire vocabulary but nothing in
/// the registry produces them; they can only arrive through a seed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    #[default]
    Connected,
    Disconnected,
    Error,
    Connecting,
}

impl ServerStatus {
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    /// Opaque endpoint; never parsed or dialed.
    pub url: String,
    pub description: String,
    pub status: ServerStatus,
    /// Advisory, display only.
    pub tools_count: u32,
}
