//! Bearer token verification errors and `WWW-Authenticate` construction.
//!
//! Credential failures (RFC 6750 Section 3) are kept apart from
//! [`OAuthError::JwksUnavailable`], which signals that the key set could not
//! be fetched and the caller may retry.

use std::fmt;

/// Token verification failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// No bearer token was provided in the request.
    MissingToken,

    /// The token is malformed, its signature does not verify, or no key in
    /// the JWKS matches it.
    InvalidToken {
        /// Human-readable description of why the token is invalid.
        description: String,
    },

    /// The token's `iss` claim does not match the configured issuer.
    InvalidIssuer,

    /// The token's `aud` claim does not match the configured audience.
    InvalidAudience,

    /// The token's `exp` claim is in the past.
    ExpiredToken,

    /// The JWKS endpoint could not be reached in time or returned garbage.
    JwksUnavailable {
        /// What went wrong while fetching the key set.
        description: String,
    },
}

impl OAuthError {
    /// Returns the HTTP status code for this error.
    ///
    /// 503 for an unavailable key set, 401 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            OAuthError::JwksUnavailable { .. } => 503,
            _ => 401,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OAuthError::JwksUnavailable { .. })
    }

    /// Builds the `WWW-Authenticate` challenge for credential failures.
    ///
    /// Returns `None` for [`OAuthError::JwksUnavailable`]: the credentials
    /// were never judged, so there is nothing to challenge.
    pub fn www_authenticate(&self) -> Option<String> {
        let description = match self {
            // RFC 6750 Section 3: no error code when no credentials were sent.
            OAuthError::MissingToken => return Some("Bearer".to_string()),
            OAuthError::JwksUnavailable { .. } => return None,
            OAuthError::InvalidToken { description } => description.as_str(),
            OAuthError::InvalidIssuer => "The token issuer is not trusted",
            OAuthError::InvalidAudience => "The token audience does not match this resource",
            OAuthError::ExpiredToken => "The access token has expired",
        };
        Some(format!(
            "Bearer error=\"invalid_token\", error_description=\"{}\"",
            description.replace('"', "'")
        ))
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthError::MissingToken => write!(f, "missing bearer token"),
            OAuthError::InvalidToken { description } => {
                write!(f, "invalid token: {}", description)
            }
            OAuthError::InvalidIssuer => write!(f, "token issuer does not match"),
            OAuthError::InvalidAudience => write!(f, "token audience does not match"),
            OAuthError::ExpiredToken => write!(f, "token has expired"),
            OAuthError::JwksUnavailable { description } => {
                write!(f, "JWKS unavailable: {}", description)
            }
        }
    }
}

impl std::error::Error for OAuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token() {
        let err = OAuthError::MissingToken;
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.www_authenticate().as_deref(), Some("Bearer"));
    }

    #[test]
    fn test_invalid_token() {
        let err = OAuthError::InvalidToken {
            description: "signature mismatch".to_string(),
        };
        assert_eq!(err.status_code(), 401);
        let header = err.www_authenticate().unwrap();
        assert!(header.contains("error=\"invalid_token\""));
        assert!(header.contains("error_description=\"signature mismatch\""));
    }

    #[test]
    fn test_description_quotes_are_escaped() {
        let err = OAuthError::InvalidToken {
            description: "bad \"kid\"".to_string(),
        };
        let header = err.www_authenticate().unwrap();
        assert!(header.ends_with("error_description=\"bad 'kid'\""));
    }

    #[test]
    fn test_claim_mismatches() {
        for err in [OAuthError::InvalidIssuer, OAuthError::InvalidAudience] {
            assert_eq!(err.status_code(), 401);
            assert!(!err.is_retryable());
            assert!(err.www_authenticate().unwrap().contains("invalid_token"));
        }
    }

    #[test]
    fn test_expired_token() {
        let err = OAuthError::ExpiredToken;
        assert_eq!(err.status_code(), 401);
        assert!(err.www_authenticate().unwrap().contains("expired"));
    }

    #[test]
    fn test_jwks_unavailable() {
        let err = OAuthError::JwksUnavailable {
            description: "timed out".to_string(),
        };
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(err.www_authenticate().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(OAuthError::MissingToken.to_string(), "missing bearer token");
        assert_eq!(OAuthError::ExpiredToken.to_string(), "token has expired");
        assert_eq!(
            OAuthError::InvalidAudience.to_string(),
            "token audience does not match"
        );
    }
}
