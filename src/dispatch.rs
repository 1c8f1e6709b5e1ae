//! Tool dispatch.
//!
//! [`Dispatcher`] resolves a [`ToolCall`] against the [`ToolRegistry`] and
//! runs the handler. It is a Tower [`Service`], so transport-independent
//! middleware (see [`DispatchTracingLayer`](crate::DispatchTracingLayer))
//! wraps it directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tower_service::Service;

use crate::error::{Error, Result};
use crate::oauth::{Identity, OAuthError};
use crate::registry::ToolRegistry;

/// A single tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Registered tool name.
    pub name: String,
    /// Keyword (object) or positional (array) arguments.
    pub arguments: Value,
    /// Verified caller, if the request was authenticated.
    pub identity: Option<Identity>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            identity: None,
        }
    }

    /// Attach the caller's verified claims.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Looks up and invokes registered tools.
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: impl Into<Arc<ToolRegistry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke the tool named by `call`.
    ///
    /// - unknown name: [`Error::UnknownTool`]
    /// - tool needs identity and none is attached: authentication error
    /// - argument or handler failure: [`Error::ToolExecution`]
    pub async fn dispatch(&self, call: ToolCall) -> Result<Value> {
        let ToolCall {
            name,
            arguments,
            identity,
        } = call;

        let tool = self
            .registry
            .get(&name)
            .ok_or_else(|| Error::UnknownTool(name.clone()))?;

        if tool.needs_identity && identity.is_none() {
            return Err(OAuthError::MissingToken.into());
        }

        tool.call(identity, arguments)
            .await
            .map_err(|source| Error::tool_execution(name, source))
    }
}

impl Service<ToolCall> for Dispatcher {
    type Response = Value;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.dispatch(call).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ToolError, ToolErrorKind};
    use crate::oauth::ClaimSet;
    use crate::tool::{NoParams, ToolBuilder};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct DivideInput {
        a: i64,
        b: i64,
    }

    fn dispatcher() -> Dispatcher {
        let divide = ToolBuilder::new("divide")
            .handler(|input: DivideInput| async move {
                if input.b == 0 {
                    return Err(ToolError::invalid_argument("division by zero"));
                }
                Ok(input.a as f64 / input.b as f64)
            })
            .build()
            .unwrap();
        let whoami = ToolBuilder::new("whoami")
            .identity_handler(|claims: Identity, _: NoParams| async move {
                Ok::<_, ToolError>(claims.sub.clone())
            })
            .build()
            .unwrap();
        Dispatcher::new(ToolRegistry::with_tools([divide, whoami]).unwrap())
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let result = dispatcher()
            .dispatch(ToolCall::new("divide", json!({"a": 10, "b": 4})))
            .await
            .unwrap();
        assert_eq!(result, json!(2.5));
    }

    #[tokio::test]
    async fn test_dispatch_is_idempotent() {
        let dispatcher = dispatcher();
        let call = ToolCall::new("divide", json!([9, 3]));
        let first = dispatcher.dispatch(call.clone()).await.unwrap();
        let second = dispatcher.dispatch(call).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = dispatcher()
            .dispatch(ToolCall::new("nope", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownToolError);
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_handler_error_is_wrapped() {
        let err = dispatcher()
            .dispatch(ToolCall::new("divide", json!({"a": 10, "b": 0})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolExecutionError);
        assert_eq!(err.tool_error_kind(), Some(ToolErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_invalid_argument() {
        let err = dispatcher()
            .dispatch(ToolCall::new("divide", json!({"a": "ten"})))
            .await
            .unwrap_err();
        assert_eq!(err.tool_error_kind(), Some(ToolErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_identity_required() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(ToolCall::new("whoami", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);

        let claims = Arc::new(ClaimSet {
            sub: Some("u1".to_string()),
            ..Default::default()
        });
        let result = dispatcher
            .dispatch(ToolCall::new("whoami", Value::Null).with_identity(claims))
            .await
            .unwrap();
        assert_eq!(result, json!("u1"));
    }

    #[tokio::test]
    async fn test_service_oneshot() {
        let result = dispatcher()
            .oneshot(ToolCall::new("divide", json!({"a": 1, "b": 2})))
            .await
            .unwrap();
        assert_eq!(result, json!(0.5));
    }
}
