//! System instruction and tool declaration for the orchestrator.

use crate::mcp::{ServerRecord, ServerStatus};

use super::{FunctionDeclaration, FunctionParam, ParamType};

/// Name of the single function advertised to the model.
pub const ROUTER_TOOL_NAME: &str = "execute_mcp_tool";

/// Line used in place of the server list when nothing is connected.
pub const NO_SERVERS_LINE: &str = "No servers currently connected.";

/// One line per connected server, `- {name} ({url}): {description}`.
pub fn server_lines(servers: &[ServerRecord]) -> Vec<String> {
    servers
        .iter()
        .filter(|s| s.status == ServerStatus::Connected)
        .map(|s| format!("- {} ({}): {}", s.name, s.url, s.description))
        .collect()
}

/// Build the system instruction describing the connected servers.
pub fn system_preamble(servers: &[ServerRecord]) -> String {
    let lines = server_lines(servers);
    let server_block = if lines.is_empty() {
        NO_SERVERS_LINE.to_string()
    } else {
        lines.join("\n")
    };

    format!(
        "You are the Nexus Agentic Orchestrator.\n\
         You verify and coordinate tasks across multiple Model Context Protocol (MCP) servers.\n\
         \n\
         Available Connected Servers:\n\
         {server_block}\n\
         \n\
         If a user request requires external data or actions, use the '{ROUTER_TOOL_NAME}' function.\n\
         If the request is general knowledge, answer directly.\n\
         Always match the tool usage to the most appropriate server description."
    )
}

/// `execute_mcp_tool(serverName, toolName, arguments)`, all strings, all required.
///
/// `arguments` is expected to carry serialized JSON but is not validated
/// before it goes out.
pub fn router_tool_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: ROUTER_TOOL_NAME,
        description: "Executes a specific tool on a connected MCP server.",
        params: vec![
            FunctionParam {
                name: "serverName",
                kind: ParamType::String,
                description: "The name of the MCP server to route the request to.",
                required: true,
            },
            FunctionParam {
                name: "toolName",
                kind: ParamType::String,
                description: "The specific tool function to call on the server.",
                required: true,
            },
            FunctionParam {
                name: "arguments",
                kind: ParamType::String,
                description: "JSON stringified arguments for the tool.",
                required: true,
            },
        ],
    }
}
