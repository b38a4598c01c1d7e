//! Registry of (simulated) Model Context Protocol servers.
//!
//! The orchestrator never connects to these servers. Their names, URLs and
//! descriptions are summarized into the model's system instruction so it can
//! pick a target for `execute_mcp_tool`.
//!
//! # Seeding
//!
//! Without a seed file the registry starts with three demo servers. A seed
//! file follows the familiar `mcp.json` layout:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "Linear Issues": {
//!       "url": "https://api.linear.app/graphql",
//!       "description": "Create and update Linear tickets.",
//!       "toolsCount": 8
//!     }
//!   }
//! }
//! ```

pub mod config;
pub mod registry;
pub mod types;

pub use registry::ServerRegistry;
pub use types::{ServerRecord, ServerStatus};
