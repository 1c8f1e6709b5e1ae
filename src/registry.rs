//! Tool registry.
//!
//! [`ToolRegistry`] maps unique names to tools. It is populated at startup
//! and shared read-only (behind an `Arc`) once serving begins.
//!
//! # Example
//!
//! ```rust
//! use mcp_oauth_server::{NoParams, ToolBuilder, ToolError, ToolRegistry};
//!
//! let ping = ToolBuilder::new("ping")
//!     .handler(|_: NoParams| async { Ok::<_, ToolError>("pong") })
//!     .build()
//!     .unwrap();
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(ping).unwrap();
//! assert!(registry.contains("ping"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::ToolDefinition;
use crate::tool::Tool;

/// Name-unique collection of tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `tools`, failing on the first duplicate name.
    pub fn with_tools(tools: impl IntoIterator<Item = Tool>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool.
    ///
    /// Fails with [`Error::DuplicateTool`] if the name is taken; the
    /// existing registration is kept.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(Error::DuplicateTool(tool.name));
        }
        tracing::debug!(tool = %tool.name, needs_identity = tool.needs_identity, "Registered tool");
        self.tools.insert(tool.name.clone(), Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Listing of all tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tool::{NoParams, ToolBuilder};
    use serde_json::{Value, json};

    fn make_tool(name: &str, reply: &'static str) -> Tool {
        ToolBuilder::new(name)
            .description(format!("{} tool", name))
            .handler(move |_: NoParams| async move { Ok::<_, ToolError>(reply) })
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(make_tool("echo", "a")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("echo"));
        assert_eq!(registry.get("echo").unwrap().name, "echo");
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_keeps_first_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(make_tool("echo", "first")).unwrap();

        let err = registry.register(make_tool("echo", "second")).unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(ref name) if name == "echo"));
        assert_eq!(registry.len(), 1);

        let tool = registry.get("echo").unwrap();
        assert_eq!(tool.call(None, Value::Null).await.unwrap(), json!("first"));
    }

    #[test]
    fn test_with_tools_rejects_duplicates() {
        let result = ToolRegistry::with_tools([make_tool("a", "1"), make_tool("a", "2")]);
        assert!(matches!(result, Err(Error::DuplicateTool(_))));

        let registry = ToolRegistry::with_tools([make_tool("a", "1"), make_tool("b", "2")]).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_definitions_are_sorted() {
        let registry = ToolRegistry::with_tools([
            make_tool("subtract", "-"),
            make_tool("add", "+"),
            make_tool("multiply", "*"),
        ])
        .unwrap();
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["add", "multiply", "subtract"]);
        assert_eq!(registry.names(), names);
    }
}
