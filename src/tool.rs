//! Tool definition and builder API.
//!
//! A [`Tool`] pairs a validated name with a handler and the JSON schema of
//! its input. Tools are usually built with [`ToolBuilder`]:
//!
//! ```rust
//! use mcp_oauth_server::{ToolBuilder, ToolError};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct EchoInput { message: String }
//!
//! let tool = ToolBuilder::new("echo")
//!     .description("Echo a message")
//!     .handler(|input: EchoInput| async move { Ok::<_, ToolError>(input.message) })
//!     .build()
//!     .unwrap();
//! assert_eq!(tool.name, "echo");
//! ```
//!
//! # Arguments
//!
//! Arguments arrive as JSON. An object binds by field name; an array binds
//! positionally in the field order of the input type; `null` is treated as
//! an empty object. Arguments that do not fit the input type fail with
//! [`ToolErrorKind::InvalidArgument`](crate::error::ToolErrorKind::InvalidArgument).

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result, ToolError};
use crate::oauth::Identity;
use crate::protocol::ToolDefinition;

/// Validate a tool name.
///
/// Names are 1-128 characters of ASCII letters, digits, `_`, `-` and `.`.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidToolName(
            "tool name cannot be empty".to_string(),
        ));
    }
    if name.len() > 128 {
        return Err(Error::InvalidToolName(format!(
            "'{}' exceeds maximum length of 128 characters (got {})",
            name,
            name.len()
        )));
    }
    if let Some(invalid_char) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-' && *c != '.')
    {
        return Err(Error::InvalidToolName(format!(
            "'{}' contains invalid character '{}'",
            name, invalid_char
        )));
    }
    Ok(())
}

/// A boxed future for tool handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a single handler invocation.
pub type ToolResult = std::result::Result<Value, ToolError>;

/// Tool handler trait - the core abstraction for tool execution
pub trait ToolHandler: Send + Sync {
    /// Execute the tool.
    ///
    /// `identity` is the verified caller, when the request carried one.
    fn call(&self, identity: Option<Identity>, args: Value) -> BoxFuture<'_, ToolResult>;

    /// Whether the handler must be given the caller's claims.
    fn needs_identity(&self) -> bool {
        false
    }

    /// JSON schema of the accepted arguments.
    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }
}

/// A registered, invokable tool.
#[derive(Clone)]
pub struct Tool {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Whether invocation requires a verified identity
    pub needs_identity: bool,
    input_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("needs_identity", &self.needs_identity)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Start building a tool.
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name)
    }

    /// Create a tool from a custom [`ToolHandler`].
    pub fn from_handler<H: ToolHandler + 'static>(
        name: impl Into<String>,
        description: Option<String>,
        handler: H,
    ) -> Result<Self> {
        let name = name.into();
        validate_tool_name(&name)?;
        Ok(Self {
            name,
            description,
            needs_identity: handler.needs_identity(),
            input_schema: handler.input_schema(),
            handler: Arc::new(handler),
        })
    }

    /// Invoke the handler.
    pub async fn call(&self, identity: Option<Identity>, args: Value) -> ToolResult {
        self.handler.call(identity, args).await
    }

    /// JSON schema of the accepted arguments.
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Listing entry for this tool.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            requires_identity: self.needs_identity,
        }
    }
}

/// Input type for tools that take no arguments.
///
/// Accepts `null`, any object and an empty array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Builder for [`Tool`].
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
}

impl ToolBuilder {
    /// Start building a tool. The name is validated by
    /// [`ToolBuilderWithHandler::build`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Set the tool description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Specify input type and handler.
    ///
    /// The input type must implement `JsonSchema` and `DeserializeOwned`;
    /// the output is serialized to JSON.
    pub fn handler<I, O, F, Fut>(self, handler: F) -> ToolBuilderWithHandler<TypedHandler<I, F>>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<O, ToolError>> + Send + 'static,
    {
        ToolBuilderWithHandler {
            name: self.name,
            description: self.description,
            handler: TypedHandler {
                handler,
                _phantom: PhantomData,
            },
        }
    }

    /// Specify input type and a handler that receives the caller's claims.
    ///
    /// The resulting tool declares that it needs identity; the dispatcher
    /// rejects calls that carry none.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use mcp_oauth_server::{ClaimSet, NoParams, ToolBuilder, ToolError};
    ///
    /// let tool = ToolBuilder::new("whoami")
    ///     .identity_handler(|claims: Arc<ClaimSet>, _: NoParams| async move {
    ///         Ok::<_, ToolError>(claims.sub.clone())
    ///     })
    ///     .build()
    ///     .unwrap();
    /// assert!(tool.needs_identity);
    /// ```
    pub fn identity_handler<I, O, F, Fut>(
        self,
        handler: F,
    ) -> ToolBuilderWithHandler<IdentityHandler<I, F>>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(Identity, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<O, ToolError>> + Send + 'static,
    {
        ToolBuilderWithHandler {
            name: self.name,
            description: self.description,
            handler: IdentityHandler {
                handler,
                _phantom: PhantomData,
            },
        }
    }
}

/// Builder state after handler is specified
pub struct ToolBuilderWithHandler<H> {
    name: String,
    description: Option<String>,
    handler: H,
}

impl<H: ToolHandler + 'static> ToolBuilderWithHandler<H> {
    /// Build the tool
    ///
    /// Returns an error if the tool name is invalid.
    pub fn build(self) -> Result<Tool> {
        Tool::from_handler(self.name, self.description, self.handler)
    }
}

// =============================================================================
// Handler implementations
// =============================================================================

/// Handler that deserializes input to a specific type
pub struct TypedHandler<I, F> {
    handler: F,
    _phantom: PhantomData<fn(I)>,
}

impl<I, O, F, Fut> ToolHandler for TypedHandler<I, F>
where
    I: JsonSchema + DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<O, ToolError>> + Send + 'static,
{
    fn call(&self, _identity: Option<Identity>, args: Value) -> BoxFuture<'_, ToolResult> {
        Box::pin(async move {
            let input: I = decode_arguments(args)?;
            encode_output((self.handler)(input).await?)
        })
    }

    fn input_schema(&self) -> Value {
        schema_of::<I>()
    }
}

/// Handler that additionally receives the verified claims
pub struct IdentityHandler<I, F> {
    handler: F,
    _phantom: PhantomData<fn(I)>,
}

impl<I, O, F, Fut> ToolHandler for IdentityHandler<I, F>
where
    I: JsonSchema + DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(Identity, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<O, ToolError>> + Send + 'static,
{
    fn call(&self, identity: Option<Identity>, args: Value) -> BoxFuture<'_, ToolResult> {
        Box::pin(async move {
            let Some(identity) = identity else {
                return Err(ToolError::failed("caller identity is required"));
            };
            let input: I = decode_arguments(args)?;
            encode_output((self.handler)(identity, input).await?)
        })
    }

    fn needs_identity(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        schema_of::<I>()
    }
}

/// Bind JSON arguments to `I`.
///
/// Objects bind by name, arrays by position, `null` as `{}`.
pub fn decode_arguments<I: DeserializeOwned>(args: Value) -> std::result::Result<I, ToolError> {
    let args = match args {
        Value::Null => Value::Object(serde_json::Map::new()),
        Value::Object(_) | Value::Array(_) => args,
        other => {
            return Err(ToolError::invalid_argument(format!(
                "arguments must be an object or an array, got {}",
                json_type(&other)
            )));
        }
    };
    serde_json::from_value(args)
        .map_err(|e| ToolError::invalid_argument(format!("invalid arguments: {}", e)))
}

fn encode_output<O: Serialize>(output: O) -> ToolResult {
    serde_json::to_value(output)
        .map_err(|e| ToolError::failed(format!("failed to serialize result: {}", e)))
}

fn schema_of<I: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(I);
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
