//! Tool call tracing middleware.
//!
//! This module provides [`DispatchTracingLayer`], a Tower middleware that
//! logs structured information about each tool call using the [`tracing`]
//! crate.
//!
//! # Example
//!
//! ```rust
//! use mcp_oauth_server::{DispatchTracingLayer, Dispatcher, ToolRegistry};
//! use tower::Layer;
//!
//! let dispatcher = Dispatcher::new(ToolRegistry::new());
//! let traced = DispatchTracingLayer::new().layer(dispatcher);
//! ```
//!
//! # Logged Information
//!
//! For each call, the layer records:
//! - Tool name
//! - Caller subject (when the call carries an identity)
//! - Duration
//! - Outcome (success, or the error kind and reason)
//!
//! # Log Levels
//!
//! - Configured level (default `INFO`): call completion
//! - `WARN`: failed calls

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use serde_json::Value;
use tower::Layer;
use tower_service::Service;
use tracing::{Instrument, Level, Span};

use crate::dispatch::ToolCall;
use crate::error::Error;

/// Tower layer that adds structured tracing to tool calls.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTracingLayer {
    level: Level,
}

impl Default for DispatchTracingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTracingLayer {
    /// Create a new tracing layer with default settings (INFO level).
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    /// Set the log level for completed calls.
    ///
    /// Default is `INFO`. Failures are always logged at `WARN`.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl<S> Layer<S> for DispatchTracingLayer {
    type Service = DispatchTracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DispatchTracingService {
            inner,
            level: self.level,
        }
    }
}

/// Tower service that adds tracing to tool calls.
///
/// Created by [`DispatchTracingLayer`].
#[derive(Debug, Clone)]
pub struct DispatchTracingService<S> {
    inner: S,
    level: Level,
}

impl<S> Service<ToolCall> for DispatchTracingService<S>
where
    S: Service<ToolCall, Response = Value, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Value;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Value, Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let tool = call.name.clone();
        let subject = call
            .identity
            .as_ref()
            .and_then(|claims| claims.sub.clone());
        let span = create_span(self.level, &tool, subject.as_deref());

        let start = Instant::now();
        let fut = self.inner.call(call);
        let level = self.level;

        Box::pin(
            async move {
                let result = fut.await;
                let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

                match &result {
                    Ok(_) => log_success(level, &tool, duration_ms),
                    Err(err) => {
                        tracing::warn!(
                            tool = %tool,
                            kind = ?err.kind(),
                            reason = ?err.tool_error_kind(),
                            error = %err,
                            duration_ms = duration_ms,
                            "Tool call failed"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Create a tracing span with the appropriate level.
fn create_span(level: Level, tool: &str, subject: Option<&str>) -> Span {
    match level {
        Level::TRACE => tracing::trace_span!("tool_call", tool = %tool, subject = subject),
        Level::DEBUG => tracing::debug_span!("tool_call", tool = %tool, subject = subject),
        Level::INFO => tracing::info_span!("tool_call", tool = %tool, subject = subject),
        Level::WARN => tracing::warn_span!("tool_call", tool = %tool, subject = subject),
        Level::ERROR => tracing::error_span!("tool_call", tool = %tool, subject = subject),
    }
}

/// Log successful call completion at the configured level.
fn log_success(level: Level, tool: &str, duration_ms: f64) {
    match level {
        Level::TRACE => {
            tracing::trace!(tool = %tool, duration_ms = duration_ms, "Tool call completed")
        }
        Level::DEBUG => {
            tracing::debug!(tool = %tool, duration_ms = duration_ms, "Tool call completed")
        }
        Level::INFO => {
            tracing::info!(tool = %tool, duration_ms = duration_ms, "Tool call completed")
        }
        Level::WARN => {
            tracing::warn!(tool = %tool, duration_ms = duration_ms, "Tool call completed")
        }
        Level::ERROR => {
            tracing::error!(tool = %tool, duration_ms = duration_ms, "Tool call completed")
        }
    }
}
