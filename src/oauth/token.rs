//! Verified token claims and the [`TokenValidator`] seam.
//!
//! A [`ClaimSet`] is built once per request from a token that passed
//! verification and is dropped with the request. Claims the server reads
//! are explicit optional fields; everything else lands in
//! [`ClaimSet::extra`], so serializing a claim set reproduces the payload.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::error::OAuthError;

/// Audience claim value, which can be a single string or array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenAudience {
    /// A single audience string.
    Single(String),
    /// Multiple audience strings.
    Multiple(Vec<String>),
}

impl TokenAudience {
    /// Check if the audience contains a specific value.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            TokenAudience::Single(s) => s == value,
            TokenAudience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Scope claim value.
///
/// RFC 8693 `scope` is a space-delimited string; some providers (Okta's
/// `scp`) send a JSON array instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    /// Space-delimited scopes.
    Delimited(String),
    /// One scope per element.
    List(Vec<String>),
}

impl ScopeClaim {
    /// Individual scopes, in token order.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ScopeClaim::Delimited(s) => s.split_whitespace().map(String::from).collect(),
            ScopeClaim::List(v) => v.clone(),
        }
    }
}

/// Claims decoded from a verified bearer token.
///
/// Absent claims are `None`; consumers choose their own defaults (the
/// identity tool documents its own).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject (user identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Intended audience(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<TokenAudience>,

    /// Issued-at (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Time the end user authenticated (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Provider-specific secondary user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Provider-specific client id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// OAuth client id (RFC 9068).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Provider-specific scope list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<ScopeClaim>,

    /// Standard scope claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeClaim>,

    /// Additional claims not covered by the fields above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ClaimSet {
    /// Granted scopes: `scp` when present, otherwise `scope`, otherwise empty.
    pub fn scopes(&self) -> Vec<String> {
        self.scp
            .as_ref()
            .or(self.scope.as_ref())
            .map(ScopeClaim::to_vec)
            .unwrap_or_default()
    }

    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().iter().any(|s| s == scope)
    }

    /// Client id: `cid` when present, otherwise `client_id`.
    pub fn client(&self) -> Option<&str> {
        self.cid.as_deref().or(self.client_id.as_deref())
    }
}

/// Trait for validating OAuth access tokens.
///
/// [`JwksValidator`](super::JwksValidator) is the production implementation;
/// tests plug in static validators.
pub trait TokenValidator: Clone + Send + Sync + 'static {
    /// Validate an access token and return the extracted claims.
    fn validate_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<ClaimSet, OAuthError>> + Send;
}
