//! Tower middleware enforcing bearer authentication at the HTTP level.
//!
//! [`BearerAuthLayer`] sits in front of the tool endpoints. Requests without
//! a verifiable `Authorization: Bearer <token>` header are answered here and
//! never reach the dispatcher; verified requests carry their [`ClaimSet`]
//! (as `Arc<ClaimSet>`) in the request extensions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, header};
use axum::response::{IntoResponse, Response};
use tower::Layer;

use super::discovery::AUTHORIZATION_SERVER_METADATA_PATH;
use super::error::OAuthError;
use super::token::{ClaimSet, TokenValidator};
use crate::error::Error;

/// Tower layer that wraps services with bearer token verification.
///
/// # Example
///
/// ```rust,no_run
/// use mcp_oauth_server::oauth::{BearerAuthLayer, JwksValidator};
///
/// let validator = JwksValidator::builder("https://auth.example.com/jwks")
///     .expected_issuer("https://auth.example.com")
///     .build()
///     .unwrap();
///
/// let layer = BearerAuthLayer::new(validator).public_path("/health");
/// ```
#[derive(Clone)]
pub struct BearerAuthLayer<V: TokenValidator> {
    validator: V,
    public_paths: Arc<Vec<String>>,
}

impl<V: TokenValidator> BearerAuthLayer<V> {
    /// Create a layer verifying tokens with `validator`.
    ///
    /// The authorization server metadata path is always public.
    pub fn new(validator: V) -> Self {
        Self {
            validator,
            public_paths: Arc::new(vec![AUTHORIZATION_SERVER_METADATA_PATH.to_string()]),
        }
    }

    /// Add a path that does not require authentication.
    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.public_paths).push(path.into());
        self
    }
}

impl<S, V: TokenValidator> Layer<S> for BearerAuthLayer<V> {
    type Service = BearerAuthService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            validator: self.validator.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

/// Tower service that verifies bearer tokens on HTTP requests.
///
/// Created by [`BearerAuthLayer`]. For each incoming request:
///
/// 1. Public paths pass through untouched
/// 2. The `Authorization: Bearer <token>` header is extracted
/// 3. The token is verified via [`TokenValidator`]
/// 4. On success, `Arc<ClaimSet>` is inserted into request extensions
/// 5. On failure, a structured JSON error is returned (401, or 503 when
///    the key set is unavailable)
#[derive(Clone)]
pub struct BearerAuthService<S, V: TokenValidator> {
    inner: S,
    validator: V,
    public_paths: Arc<Vec<String>>,
}

impl<S, V> tower_service::Service<Request<Body>> for BearerAuthService<S, V>
where
    S: tower_service::Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    V: TokenValidator,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let is_public = self
            .public_paths
            .iter()
            .any(|p| req.uri().path() == p.as_str());
        let validator = self.validator.clone();
        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if is_public {
                return inner.call(req).await;
            }

            let Some(token) = bearer_token(&req) else {
                tracing::debug!(path = %req.uri().path(), "Rejected request without bearer token");
                return Ok(Error::from(OAuthError::MissingToken).into_response());
            };

            let claims = match validator.validate_token(&token).await {
                Ok(claims) => claims,
                Err(error) => {
                    tracing::warn!(
                        path = %req.uri().path(),
                        error = %error,
                        retryable = error.is_retryable(),
                        "Rejected bearer token"
                    );
                    return Ok(Error::from(error).into_response());
                }
            };

            req.extensions_mut().insert(Arc::new(claims));
            inner.call(req).await
        })
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively per RFC 7235.
fn bearer_token(req: &Request<Body>) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Verified claims attached to a request by [`BearerAuthService`].
pub type Identity = Arc<ClaimSet>;
