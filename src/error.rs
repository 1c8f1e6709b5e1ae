//! Error types for the tool server.
//!
//! Every failure that can reach a caller is an [`Error`]. Each variant maps
//! to an [`ErrorKind`], which decides both the HTTP status and the `kind`
//! field of the JSON error body:
//!
//! ```json
//! {"error": {"kind": "UnknownToolError", "message": "unknown tool: nope"}}
//! ```

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::oauth::OAuthError;

/// Boxed error for binaries and tests.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad, expired or mismatched credentials. Not retryable.
    AuthenticationError,
    /// The JWKS endpoint could not be reached. Retryable.
    #[serde(rename = "JWKSUnavailable")]
    JwksUnavailable,
    /// No tool is registered under the requested name.
    UnknownToolError,
    /// A tool name was registered twice. Startup only.
    DuplicateToolError,
    /// A tool name failed validation. Startup only.
    InvalidToolName,
    /// The handler (or argument decoding) failed.
    ToolExecutionError,
    /// The request body was not a valid tool invocation.
    InvalidRequest,
    /// Configuration could not be loaded. Startup only.
    ConfigurationError,
    /// The listener could not be bound or the server failed.
    TransportError,
}

impl ErrorKind {
    /// HTTP status used when this kind crosses the transport boundary.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::AuthenticationError => StatusCode::UNAUTHORIZED,
            ErrorKind::JwksUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::UnknownToolError => StatusCode::NOT_FOUND,
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::ToolExecutionError
            | ErrorKind::DuplicateToolError
            | ErrorKind::InvalidToolName
            | ErrorKind::ConfigurationError
            | ErrorKind::TransportError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Sub-classification of a handler-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolErrorKind {
    /// The arguments were well-formed JSON but outside the tool's domain
    /// (wrong shape, division by zero, overflow).
    InvalidArgument,
    /// Any other handler failure.
    Failed,
}

/// Error returned by tool handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    /// What went wrong.
    pub kind: ToolErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ToolError {
    /// The arguments are not acceptable for this tool.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidArgument,
            message: message.into(),
        }
    }

    /// The handler failed for a reason unrelated to its arguments.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Failed,
            message: message.into(),
        }
    }
}

/// Crate error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] OAuthError),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("invalid tool name: {0}")]
    InvalidToolName(String),

    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Wrap a handler error raised while executing `tool`.
    pub fn tool_execution(tool: impl Into<String>, source: ToolError) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(OAuthError::JwksUnavailable { .. }) => ErrorKind::JwksUnavailable,
            Error::Auth(_) => ErrorKind::AuthenticationError,
            Error::UnknownTool(_) => ErrorKind::UnknownToolError,
            Error::DuplicateTool(_) => ErrorKind::DuplicateToolError,
            Error::InvalidToolName(_) => ErrorKind::InvalidToolName,
            Error::ToolExecution { .. } => ErrorKind::ToolExecutionError,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Config(_) => ErrorKind::ConfigurationError,
            Error::Transport(_) => ErrorKind::TransportError,
        }
    }

    /// Handler-level reason, present only for tool execution failures.
    pub fn tool_error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Error::ToolExecution { source, .. } => Some(source.kind),
            _ => None,
        }
    }

    /// Structured body sent to the caller.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
                reason: self.tool_error_kind(),
            },
        }
    }
}

/// JSON error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ToolErrorKind>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind().status_code();
        let mut response = (status, Json(self.to_body())).into_response();

        if let Error::Auth(err) = &self {
            if let Some(challenge) = err.www_authenticate() {
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
            }
        }
        response
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
