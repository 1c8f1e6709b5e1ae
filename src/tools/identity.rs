//! The `get_me` tool.
//!
//! Projects the caller's verified claims into a flat record. The projection
//! is pure: it reads only the claim set and never fails.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};
use crate::oauth::{ClaimSet, Identity, TokenAudience};
use crate::tool::{NoParams, Tool, ToolBuilder};

/// Placeholder user id for tokens without a `sub` claim.
pub const UNKNOWN_USER: &str = "N/A";

/// Caller information returned by `get_me`.
///
/// Absent claims serialize as `null`; `scopes` is empty instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    pub uid: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<TokenAudience>,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    /// ISO-8601, UTC.
    pub issued_at: Option<String>,
    /// ISO-8601, UTC.
    pub expires_at: Option<String>,
    /// ISO-8601, UTC.
    pub auth_time: Option<String>,
    pub token_id: Option<String>,
}

impl UserInfo {
    pub fn from_claims(claims: &ClaimSet) -> Self {
        Self {
            user_id: claims
                .sub
                .clone()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            uid: claims.uid.clone(),
            issuer: claims.iss.clone(),
            audience: claims.aud.clone(),
            client_id: claims.client().map(String::from),
            scopes: claims.scopes(),
            issued_at: claims.iat.and_then(iso8601),
            expires_at: claims.exp.and_then(iso8601),
            auth_time: claims.auth_time.and_then(iso8601),
            token_id: claims.jti.clone(),
        }
    }
}

/// Render Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Out-of-range timestamps render as absent.
fn iso8601(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Build the `get_me` tool.
pub fn get_me() -> Result<Tool> {
    ToolBuilder::new("get_me")
        .description("Get authenticated user information from the verified access token")
        .identity_handler(|claims: Identity, _: NoParams| async move {
            Ok::<_, ToolError>(UserInfo::from_claims(&claims))
        })
        .build()
}
