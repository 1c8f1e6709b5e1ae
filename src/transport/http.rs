//! HTTP transport for the tool server.
//!
//! Routes:
//! - `POST {path}`: invoke a tool (`{"tool": ..., "arguments": ...}`)
//! - `GET {path}/tools`: list registered tools
//! - `GET|HEAD|OPTIONS /.well-known/oauth-authorization-server`: 307 to the
//!   upstream authorization server (public)
//!
//! Every other route sits behind [`BearerAuthLayer`]; unauthenticated
//! requests never reach the dispatcher.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_oauth_server::{Dispatcher, HttpTransport, JwksValidator, ToolRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = JwksValidator::builder("https://auth.example.com/jwks")
//!         .expected_issuer("https://auth.example.com")
//!         .build()?;
//!     let dispatcher = Dispatcher::new(ToolRegistry::new());
//!
//!     HttpTransport::new(
//!         dispatcher,
//!         validator,
//!         "https://auth.example.com/.well-known/oauth-authorization-server",
//!     )
//!     .serve("127.0.0.1:8000".parse()?)
//!     .await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::{Layer, ServiceExt};

use crate::dispatch::{Dispatcher, ToolCall};
use crate::error::{Error, Result};
use crate::oauth::{BearerAuthLayer, Identity, TokenValidator, discovery_router};
use crate::protocol::{InvocationRequest, ListToolsResult, ToolResponse};
use crate::tracing_layer::{DispatchTracingLayer, DispatchTracingService};

/// Default path serving tool invocations.
pub const DEFAULT_MCP_PATH: &str = "/mcp";

struct AppState {
    service: DispatchTracingService<Dispatcher>,
    dispatcher: Dispatcher,
}

/// HTTP transport binding the dispatcher, the token validator and the
/// discovery redirect into one axum router.
pub struct HttpTransport<V: TokenValidator> {
    dispatcher: Dispatcher,
    validator: V,
    well_known_url: String,
    path: String,
    tracing: DispatchTracingLayer,
}

impl<V: TokenValidator> HttpTransport<V> {
    /// Create a transport.
    ///
    /// `well_known_url` is the upstream authorization server metadata
    /// document that discovery requests are redirected to.
    pub fn new(dispatcher: Dispatcher, validator: V, well_known_url: impl Into<String>) -> Self {
        Self {
            dispatcher,
            validator,
            well_known_url: well_known_url.into(),
            path: DEFAULT_MCP_PATH.to_string(),
            tracing: DispatchTracingLayer::new(),
        }
    }

    /// Serve invocations at `path` instead of `/mcp`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the per-call tracing layer.
    pub fn tracing(mut self, layer: DispatchTracingLayer) -> Self {
        self.tracing = layer;
        self
    }

    /// Build the axum router for this transport.
    pub fn into_router(self) -> Router {
        let state = Arc::new(AppState {
            service: self.tracing.layer(self.dispatcher.clone()),
            dispatcher: self.dispatcher,
        });
        let tools_path = format!("{}/tools", self.path.trim_end_matches('/'));

        Router::new()
            .route(&self.path, post(handle_invoke))
            .route(&tools_path, get(handle_list_tools))
            .with_state(state)
            .merge(discovery_router(self.well_known_url))
            .layer(BearerAuthLayer::new(self.validator))
    }

    /// Bind `addr` and serve until Ctrl-C or SIGTERM.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|e| Error::Transport(format!("Failed to read local address: {}", e)))?;
        tracing::info!(
            addr = %local,
            path = %self.path,
            tools = self.dispatcher.registry().len(),
            "Tool server listening"
        );

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Transport(format!("Server error: {}", e)))?;

        tracing::info!("Tool server stopped");
        Ok(())
    }
}

async fn handle_invoke(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
    body: std::result::Result<Json<InvocationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_response(),
    };

    let mut call = ToolCall::new(request.tool, request.arguments);
    call.identity = identity.map(|Extension(claims)| claims);

    match state.service.clone().oneshot(call).await {
        Ok(result) => Json(ToolResponse { result }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_list_tools(State(state): State<Arc<AppState>>) -> Json<ListToolsResult> {
    Json(ListToolsResult {
        tools: state.dispatcher.registry().definitions(),
    })
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::oauth::{ClaimSet, OAuthError};
    use crate::registry::ToolRegistry;
    use crate::tool::{NoParams, ToolBuilder};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};

    const UPSTREAM: &str = "https://auth.example.com/.well-known/oauth-authorization-server";

    #[derive(Clone)]
    struct StaticValidator;

    impl TokenValidator for StaticValidator {
        async fn validate_token(&self, token: &str) -> std::result::Result<ClaimSet, OAuthError> {
            if token == "good" {
                Ok(ClaimSet {
                    sub: Some("u1".to_string()),
                    ..Default::default()
                })
            } else {
                Err(OAuthError::InvalidToken {
                    description: "bad signature".to_string(),
                })
            }
        }
    }

    fn app() -> Router {
        let ping = ToolBuilder::new("ping")
            .handler(|_: NoParams| async { Ok::<_, ToolError>("pong") })
            .build()
            .unwrap();
        let whoami = ToolBuilder::new("whoami")
            .identity_handler(|claims: Identity, _: NoParams| async move {
                Ok::<_, ToolError>(claims.sub.clone())
            })
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(ToolRegistry::with_tools([ping, whoami]).unwrap());
        HttpTransport::new(dispatcher, StaticValidator, UPSTREAM).into_router()
    }

    fn invoke(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let response = app()
            .oneshot(invoke(Some("good"), r#"{"tool": "ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"result": "pong"}));
    }

    #[tokio::test]
    async fn test_identity_flows_to_handler() {
        let response = app()
            .oneshot(invoke(Some("good"), r#"{"tool": "whoami", "arguments": {}}"#))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({"result": "u1"}));
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let response = app()
            .oneshot(invoke(None, r#"{"tool": "ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["error"]["kind"],
            "AuthenticationError"
        );
    }

    #[tokio::test]
    async fn test_bad_token_is_401() {
        let response = app()
            .oneshot(invoke(Some("forged"), r#"{"tool": "ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let response = app()
            .oneshot(invoke(Some("good"), r#"{"tool": "nope"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["kind"], "UnknownToolError");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let response = app()
            .oneshot(invoke(Some("good"), "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["kind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_list_tools() {
        let request = Request::builder()
            .uri("/mcp/tools")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "ping");
        assert_eq!(tools[1]["name"], "whoami");
        assert_eq!(tools[1]["requiresIdentity"], true);
    }

    #[tokio::test]
    async fn test_discovery_redirect_is_public() {
        let request = Request::builder()
            .uri("/.well-known/oauth-authorization-server")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), UPSTREAM);
    }

    #[tokio::test]
    async fn test_custom_path() {
        let dispatcher = Dispatcher::new(ToolRegistry::new());
        let app = HttpTransport::new(dispatcher, StaticValidator, UPSTREAM)
            .path("/tools-api")
            .into_router();
        let request = Request::builder()
            .method("POST")
            .uri("/tools-api")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::from(r#"{"tool": "ping"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["kind"], "UnknownToolError");
    }
}
