use uuid::Uuid;

use crate::error::RegistryError;
use crate::mcp::config::{McpConfig, expand_env_placeholders, load_mcp_config};
use crate::mcp::types::{ServerRecord, ServerStatus};

/// In-memory list of MCP server records, kept in insertion order.
///
/// Nothing here touches the network: status only changes through
/// [`ServerRegistry::toggle_connection`].
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Vec<ServerRecord>,
}

impl ServerRegistry {
    /// Creates an empty registry.
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the three demo servers.
    pub fn demo() -> Self {
        let seed = [
            (
                "1",
                "GitHub Integration",
                "ws://github-mcp.internal:8080",
                ServerStatus::Connected,
                "Access repository files, issues, and PRs.",
                12,
            ),
            (
                "2",
                "PostgreSQL Primary",
                "postgres://db-prod.internal:5432",
                ServerStatus::Disconnected,
                "Read-only access to users and orders tables.",
                5,
            ),
            (
                "3",
                "Linear Issues",
                "https://api.linear.app/graphql",
                ServerStatus::Connected,
                "Create and update Linear tickets.",
                8,
            ),
        ];

        let servers = seed
            .into_iter()
            .map(|(id, name, url, status, description, tools_count)| ServerRecord {
                id: id.to_string(),
                name: name.to_string(),
                url: url.to_string(),
                description: description.to_string(),
                status,
                tools_count,
            })
            .collect();

        Self { servers }
    }

    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let cfg = load_mcp_config(path)?;
        Ok(Self::from_config(&cfg))
    }

    /// Seed from an `mcp.json`-style config. Entries land in name order.
    pub fn from_config(cfg: &McpConfig) -> Self {
        let servers = cfg
            .mcp_servers
            .iter()
            .map(|(name, entry)| ServerRecord {
                id: Uuid::new_v4().to_string(),
                name: name.clone(),
                url: expand_env_placeholders(&entry.url),
                description: entry.description.clone(),
                status: entry.status,
                tools_count: entry.tools_count,
            })
            .collect();

        Self { servers }
    }

    /// Register a new server.
    ///
    /// New records start `Connected` with a tool count of zero; the count is
    /// only ever advisory. Duplicate URLs are accepted.
    pub fn add(
        &mut self,
        name: &str,
        url: &str,
        description: &str,
    ) -> Result<ServerRecord, RegistryError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if url.is_empty() {
            return Err(RegistryError::EmptyUrl);
        }

        let record = ServerRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            description: description.trim().to_string(),
            status: ServerStatus::Connected,
            tools_count: 0,
        };

        tracing::info!(server_id = %record.id, name = %record.name, "MCP server added");
        self.servers.push(record.clone());
        Ok(record)
    }

    /// Remove a server. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<ServerRecord> {
        let idx = self.servers.iter().position(|s| s.id == id)?;
        let removed = self.servers.remove(idx);
        tracing::info!(server_id = %id, name = %removed.name, "MCP server removed");
        Some(removed)
    }

    /// Flip between `Connected` and `Disconnected`.
    ///
    /// Records in `Error` or `Connecting` are left as they are. Returns the
    /// resulting status, or `None` if the id is unknown.
    pub fn toggle_connection(&mut self, id: &str) -> Option<ServerStatus> {
        let server = self.servers.iter_mut().find(|s| s.id == id)?;
        server.status = match server.status {
            ServerStatus::Connected => ServerStatus::Disconnected,
            ServerStatus::Disconnected => ServerStatus::Connected,
            other => other,
        };
        tracing::debug!(server_id = %id, status = ?server.status, "MCP server toggled");
        Some(server.status)
    }

    pub fn get(&self, id: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// Snapshot of all records.
    pub fn list(&self) -> Vec<ServerRecord> {
        self.servers.clone()
    }

    pub fn connected(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.iter().filter(|s| s.status.is_connected())
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique_ids(registry: &ServerRegistry) {
        let ids: HashSet<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), registry.len());
    }

    #[test]
    fn test_add_defaults() {
        let mut registry = ServerRegistry::new_empty();
        let record = registry
            .add("Slack", "https://slack.example/mcp", "Post messages.")
            .unwrap();

        assert_eq!(record.status, ServerStatus::Connected);
        assert_eq!(record.tools_count, 0);
        assert_eq!(registry.list(), vec![record]);
    }

    #[test]
    fn test_add_requires_name_and_url() {
        let mut registry = ServerRegistry::new_empty();
        assert_eq!(
            registry.add("  ", "ws://x", ""),
            Err(RegistryError::EmptyName)
        );
        assert_eq!(registry.add("X", "", ""), Err(RegistryError::EmptyUrl));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_urls_allowed() {
        let mut registry = ServerRegistry::new_empty();
        let a = registry.add("A", "ws://same", "").unwrap();
        let b = registry.add("B", "ws://same", "").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = ServerRegistry::demo();
        let before = registry.list();
        assert!(registry.remove("does-not-exist").is_none());
        assert_eq!(registry.list(), before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ServerRegistry::demo();
        assert!(registry.remove("2").is_some());
        let after_first = registry.list();
        assert!(registry.remove("2").is_none());
        assert_eq!(registry.list(), after_first);
    }

    #[test]
    fn test_toggle_flips_connected_and_disconnected() {
        let mut registry = ServerRegistry::demo();
        assert_eq!(
            registry.toggle_connection("1"),
            Some(ServerStatus::Disconnected)
        );
        assert_eq!(registry.toggle_connection("1"), Some(ServerStatus::Connected));
        assert_eq!(registry.toggle_connection("2"), Some(ServerStatus::Connected));
        assert_eq!(registry.toggle_connection("missing"), None);
    }

    #[test]
    fn test_toggle_leaves_error_and_connecting() {
        let mut cfg = McpConfig::default();
        for (name, status) in [("err", ServerStatus::Error), ("busy", ServerStatus::Connecting)] {
            cfg.mcp_servers.insert(
                name.to_string(),
                crate::mcp::config::McpServerEntry {
                    url: format!("ws://{name}"),
                    description: String::new(),
                    status,
                    tools_count: 0,
                },
            );
        }
        let mut registry = ServerRegistry::from_config(&cfg);

        for server in registry.list() {
            let original = server.status;
            assert_eq!(registry.toggle_connection(&server.id), Some(original));
        }
    }

    #[test]
    fn test_mixed_operations_keep_invariants() {
        let mut registry = ServerRegistry::demo();
        let mut added = Vec::new();

        for i in 0..20 {
            let record = registry
                .add(&format!("server-{i}"), &format!("ws://host-{}", i % 3), "")
                .unwrap();
            added.push(record.id);

            if i % 4 == 0 {
                registry.toggle_connection(&added[i / 2]);
            }
            if i % 5 == 0 {
                registry.remove(&added[i / 3]);
                registry.remove(&added[i / 3]);
            }
            registry.toggle_connection("1");
            assert_unique_ids(&registry);
        }

        assert!(registry.list().iter().all(|s| matches!(
            s.status,
            ServerStatus::Connected | ServerStatus::Disconnected
        )));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let mut registry = ServerRegistry::demo();
        registry.add("Zeta", "ws://z", "").unwrap();
        registry.add("Alpha", "ws://a", "").unwrap();

        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "GitHub Integration",
                "PostgreSQL Primary",
                "Linear Issues",
                "Zeta",
                "Alpha"
            ]
        );
    }

    #[test]
    fn test_connected_filter() {
        let registry = ServerRegistry::demo();
        let names: Vec<_> = registry.connected().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["GitHub Integration", "Linear Issues"]);
    }
}
