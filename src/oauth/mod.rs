//! OAuth 2.1 resource server support.
//!
//! The server acts as a **resource server**: it verifies bearer tokens issued
//! by an external authorization server and leaves OAuth metadata to that
//! server.
//!
//! # Architecture
//!
//! - **Claims** ([`ClaimSet`]): typed, optional-valued view of a verified
//!   token payload.
//!
//! - **Token Validation** ([`TokenValidator`]): pluggable trait for
//!   verifying access tokens. [`JwksValidator`] verifies JWTs against keys
//!   fetched from a JWKS endpoint, caching them by `kid`.
//!
//! - **HTTP Middleware** ([`BearerAuthLayer`]/[`BearerAuthService`]): Tower
//!   middleware that extracts bearer tokens, verifies them, and injects the
//!   claims into request extensions.
//!
//! - **Discovery** ([`discovery_router`]): redirects
//!   `/.well-known/oauth-authorization-server` to the upstream server.
//!
//! # Failure classes
//!
//! Bad, expired or mismatched tokens are credential failures (401, do not
//! retry). A JWKS endpoint that cannot be reached is an infrastructure
//! failure ([`OAuthError::JwksUnavailable`], 503, retry later).

pub mod discovery;
pub mod error;
pub mod jwks;
pub mod middleware;
pub mod token;

// Re-exports
pub use discovery::{AUTHORIZATION_SERVER_METADATA_PATH, discovery_router};
pub use error::OAuthError;
pub use jwks::{JwksError, JwksValidator, JwksValidatorBuilder};
pub use middleware::{BearerAuthLayer, BearerAuthService, Identity};
pub use token::{ClaimSet, ScopeClaim, TokenAudience, TokenValidator};
