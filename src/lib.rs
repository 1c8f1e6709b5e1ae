//! # mcp-oauth-server
//!
//! A tool-serving HTTP server whose callers authenticate with JWT bearer
//! tokens verified against a JWKS endpoint.
//!
//! The server is assembled from Tower pieces:
//!
//! - [`oauth::BearerAuthLayer`] rejects requests without a verifiable token
//!   before they reach any handler, and attaches the verified
//!   [`ClaimSet`] to the request.
//! - [`Dispatcher`] is a Tower [`Service`](tower_service::Service) over
//!   [`ToolCall`]s, resolving names in a [`ToolRegistry`].
//! - [`DispatchTracingLayer`] logs every call.
//! - [`HttpTransport`] binds it all to axum routes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_oauth_server::{Dispatcher, HttpTransport, JwksValidator, ToolRegistry, tools};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mcp_oauth_server::BoxError> {
//!     let validator = JwksValidator::builder("https://auth.example.com/jwks")
//!         .expected_issuer("https://auth.example.com")
//!         .expected_audience("api://default")
//!         .build()?;
//!
//!     let registry = ToolRegistry::with_tools(tools::all()?)?;
//!
//!     HttpTransport::new(
//!         Dispatcher::new(registry),
//!         validator,
//!         "https://auth.example.com/.well-known/oauth-authorization-server",
//!     )
//!     .serve("0.0.0.0:8000".parse()?)
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Kinds
//!
//! | Kind | Status | Cause |
//! |---|---|---|
//! | `AuthenticationError` | 401 | missing, malformed, forged, expired or mismatched token |
//! | `JWKSUnavailable` | 503 | signing keys could not be fetched |
//! | `UnknownToolError` | 404 | no tool under that name |
//! | `ToolExecutionError` | 500 | handler failed (`reason`: `InvalidArgument` or `Failed`) |
//! | `InvalidRequest` | 400 | body is not a tool invocation |

pub mod config;
pub mod dispatch;
pub mod error;
pub mod oauth;
pub mod protocol;
pub mod registry;
pub mod tool;
pub mod tools;
pub mod tracing_layer;
pub mod transport;

// Re-exports
pub use config::{Config, ConfigError};
pub use dispatch::{Dispatcher, ToolCall};
pub use error::{BoxError, Error, ErrorKind, Result, ToolError, ToolErrorKind};
pub use oauth::{
    BearerAuthLayer, ClaimSet, Identity, JwksError, JwksValidator, JwksValidatorBuilder,
    OAuthError, TokenValidator,
};
pub use protocol::{InvocationRequest, ListToolsResult, ToolDefinition, ToolResponse};
pub use registry::ToolRegistry;
pub use tool::{NoParams, Tool, ToolBuilder, ToolHandler};
pub use tracing_layer::{DispatchTracingLayer, DispatchTracingService};
pub use transport::HttpTransport;
