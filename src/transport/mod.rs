//! Transport implementations
//!
//! - `http` - JSON over HTTP, served with axum
//!
//! The transport owns no tool state: the [`Dispatcher`](crate::Dispatcher)
//! and token validator are built once at startup and handed in.

pub mod http;

pub use http::{DEFAULT_MCP_PATH, HttpTransport, shutdown_signal};
