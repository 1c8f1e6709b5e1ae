//! Wire types for the HTTP surface.
//!
//! A tool invocation is a JSON object naming the tool and its arguments:
//!
//! ```json
//! {"tool": "add", "arguments": {"a": 2, "b": 3}}
//! ```
//!
//! Successful calls answer `{"result": <value>}`; failures use
//! [`ErrorBody`](crate::error::ErrorBody).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /mcp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Registered tool name.
    pub tool: String,
    /// Keyword (object) or positional (array) arguments. Absent means none.
    #[serde(default)]
    pub arguments: Value,
}

/// Successful invocation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: Value,
}

/// Tool definition as returned by the tool listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    /// The tool is only callable with a verified identity.
    #[serde(default)]
    pub requires_identity: bool,
}

/// Body of `GET /mcp/tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arguments_default_to_null() {
        let req: InvocationRequest = serde_json::from_value(json!({"tool": "get_me"})).unwrap();
        assert_eq!(req.tool, "get_me");
        assert!(req.arguments.is_null());
    }

    #[test]
    fn test_missing_tool_is_rejected() {
        assert!(serde_json::from_value::<InvocationRequest>(json!({"arguments": []})).is_err());
    }

    #[test]
    fn test_definition_is_camel_case() {
        let def = ToolDefinition {
            name: "get_me".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
            requires_identity: true,
        };
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({
                "name": "get_me",
                "inputSchema": {"type": "object"},
                "requiresIdentity": true
            })
        );
    }
}
