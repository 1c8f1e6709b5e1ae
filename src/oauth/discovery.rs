//! OAuth authorization server metadata discovery (RFC 8414).
//!
//! This server does not own OAuth metadata. Requests for
//! `/.well-known/oauth-authorization-server` are answered with a
//! `307 Temporary Redirect` to the upstream authorization server's document,
//! preserving the request method.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;

/// Well-known path for authorization server metadata.
pub const AUTHORIZATION_SERVER_METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// Router serving the discovery redirect on GET, HEAD and OPTIONS.
///
/// ```rust
/// use mcp_oauth_server::oauth::discovery_router;
///
/// let app = discovery_router(
///     "https://auth.example.com/.well-known/oauth-authorization-server",
/// );
/// ```
pub fn discovery_router(upstream_url: impl Into<String>) -> Router {
    let upstream: Arc<str> = Arc::from(upstream_url.into());
    // axum answers HEAD with the GET handler (body stripped).
    Router::new()
        .route(
            AUTHORIZATION_SERVER_METADATA_PATH,
            get(redirect_upstream).options(redirect_upstream),
        )
        .with_state(upstream)
}

async fn redirect_upstream(State(upstream): State<Arc<str>>) -> Response {
    tracing::debug!(upstream = %upstream, "Redirecting authorization server discovery");
    Redirect::temporary(&upstream).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use tower::ServiceExt;

    const UPSTREAM: &str = "https://auth.example.com/.well-known/oauth-authorization-server";

    async fn send(method: Method) -> Response {
        discovery_router(UPSTREAM)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(AUTHORIZATION_SERVER_METADATA_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_redirects_get_head_and_options() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let resp = send(method.clone()).await;
            assert_eq!(
                resp.status(),
                StatusCode::TEMPORARY_REDIRECT,
                "method {}",
                method
            );
            assert_eq!(resp.headers().get(header::LOCATION).unwrap(), UPSTREAM);
        }
    }

    #[tokio::test]
    async fn test_post_is_not_allowed() {
        let resp = send(Method::POST).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
