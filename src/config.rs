//! Environment-sourced server configuration.
//!
//! Settings are read once at startup and validated before anything binds.
//! All missing required variables are reported together.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `OAUTH_JWKS_URI` | yes | |
//! | `OAUTH_ISSUER` | yes | |
//! | `OAUTH_WELL_KNOWN_URL` | yes | |
//! | `OAUTH_AUDIENCE` | no | audience not checked |
//! | `HOST` | no | `0.0.0.0` |
//! | `PORT` | no | `8000` |
//! | `OAUTH_JWKS_TIMEOUT_SECS` | no | `5` |
//! | `MCP_PATH` | no | `/mcp` |

use std::net::SocketAddr;
use std::time::Duration;

pub const JWKS_URI_VAR: &str = "OAUTH_JWKS_URI";
pub const ISSUER_VAR: &str = "OAUTH_ISSUER";
pub const WELL_KNOWN_URL_VAR: &str = "OAUTH_WELL_KNOWN_URL";
pub const AUDIENCE_VAR: &str = "OAUTH_AUDIENCE";
pub const HOST_VAR: &str = "HOST";
pub const PORT_VAR: &str = "PORT";
pub const JWKS_TIMEOUT_VAR: &str = "OAUTH_JWKS_TIMEOUT_SECS";
pub const MCP_PATH_VAR: &str = "MCP_PATH";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_JWKS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MCP_PATH: &str = "/mcp";

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// One or more required variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Validated server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JWKS endpoint of the authorization server.
    pub jwks_uri: String,
    /// Required `iss` claim.
    pub issuer: String,
    /// Required `aud` claim. `None` disables the audience check.
    pub audience: Option<String>,
    /// Upstream authorization server metadata document.
    pub well_known_url: String,
    pub host: String,
    pub port: u16,
    /// Upper bound on a single JWKS fetch.
    pub jwks_timeout: Duration,
    /// Path serving tool invocations.
    pub mcp_path: String,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Empty values are treated as unset.
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use mcp_oauth_server::Config;
    ///
    /// let env = HashMap::from([
    ///     ("OAUTH_JWKS_URI", "https://auth.example.com/jwks"),
    ///     ("OAUTH_ISSUER", "https://auth.example.com"),
    ///     ("OAUTH_WELL_KNOWN_URL", "https://auth.example.com/.well-known/oauth-authorization-server"),
    /// ]);
    /// let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.port, 8000);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut require = |name: &str| {
            let value = get(name);
            if value.is_none() {
                missing.push(name.to_string());
            }
            value.unwrap_or_default()
        };
        let jwks_uri = require(JWKS_URI_VAR);
        let issuer = require(ISSUER_VAR);
        let well_known_url = require(WELL_KNOWN_URL_VAR);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let port = match get(PORT_VAR) {
            Some(raw) => parse(PORT_VAR, &raw)?,
            None => DEFAULT_PORT,
        };
        let timeout_secs: u64 = match get(JWKS_TIMEOUT_VAR) {
            Some(raw) => parse(JWKS_TIMEOUT_VAR, &raw)?,
            None => DEFAULT_JWKS_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: JWKS_TIMEOUT_VAR.to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        let mcp_path = get(MCP_PATH_VAR).unwrap_or_else(|| DEFAULT_MCP_PATH.to_string());
        if !mcp_path.starts_with('/') || mcp_path.len() < 2 {
            return Err(ConfigError::Invalid {
                name: MCP_PATH_VAR.to_string(),
                reason: format!("'{mcp_path}' must start with '/' and name a path"),
            });
        }

        Ok(Self {
            jwks_uri,
            issuer,
            audience: get(AUDIENCE_VAR),
            well_known_url,
            host: get(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwks_timeout: Duration::from_secs(timeout_secs),
            mcp_path,
        })
    }

    /// Socket address to listen on.
    ///
    /// `HOST` may be an IPv4 or IPv6 literal (brackets optional) or a
    /// hostname; hostnames resolve once here and the first address wins.
    pub async fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let invalid = |reason: String| ConfigError::Invalid {
            name: HOST_VAR.to_string(),
            reason: format!("'{}': {}", self.host, reason),
        };

        tokio::net::lookup_host((host, self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("resolved to no addresses".to_string()))
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        (JWKS_URI_VAR, "https://auth.example.com/jwks"),
        (ISSUER_VAR, "https://auth.example.com"),
        (
            WELL_KNOWN_URL_VAR,
            "https://auth.example.com/.well-known/oauth-authorization-server",
        ),
    ];

    #[tokio::test]
    async fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.jwks_timeout, Duration::from_secs(5));
        assert_eq!(config.mcp_path, "/mcp");
        assert!(config.audience.is_none());
        assert_eq!(config.bind_addr().await.unwrap().port(), 8000);
    }

    #[test]
    fn test_all_missing_are_reported_together() {
        let err = load(&[(ISSUER_VAR, "https://auth.example.com")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![
                JWKS_URI_VAR.to_string(),
                WELL_KNOWN_URL_VAR.to_string()
            ])
        );
        let message = err.to_string();
        assert!(message.contains("OAUTH_JWKS_URI"));
        assert!(message.contains("OAUTH_WELL_KNOWN_URL"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[1] = (ISSUER_VAR, "  ");
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing(vec![ISSUER_VAR.to_string()])
        );
    }

    #[tokio::test]
    async fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (AUDIENCE_VAR, "api://default"),
            (HOST_VAR, "127.0.0.1"),
            (PORT_VAR, "9001"),
            (JWKS_TIMEOUT_VAR, "2"),
            (MCP_PATH_VAR, "/tools"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.audience.as_deref(), Some("api://default"));
        assert_eq!(config.jwks_timeout, Duration::from_secs(2));
        assert_eq!(config.mcp_path, "/tools");
        assert_eq!(
            config.bind_addr().await.unwrap(),
            "127.0.0.1:9001".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = REQUIRED.to_vec();
        vars.push((PORT_VAR, "http"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid { name, .. } if name == PORT_VAR
        ));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut vars = REQUIRED.to_vec();
        vars.push((JWKS_TIMEOUT_VAR, "0"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid { name, .. } if name == JWKS_TIMEOUT_VAR
        ));
    }

    #[test]
    fn test_relative_path_is_invalid() {
        let mut vars = REQUIRED.to_vec();
        vars.push((MCP_PATH_VAR, "mcp"));
        assert!(load(&vars).is_err());
    }

    #[tokio::test]
    async fn test_ipv6_hosts() {
        for host in ["::", "::1", "[::1]"] {
            let mut vars = REQUIRED.to_vec();
            vars.push((HOST_VAR, host));
            let addr = load(&vars).unwrap().bind_addr().await.unwrap();
            assert!(addr.is_ipv6(), "{}", host);
            assert_eq!(addr.port(), 8000);
        }
    }

    #[tokio::test]
    async fn test_hostname_resolves() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([(HOST_VAR, "localhost"), (PORT_VAR, "9002")]);
        let addr = load(&vars).unwrap().bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9002);
    }

    #[tokio::test]
    async fn test_bad_host() {
        let mut vars = REQUIRED.to_vec();
        vars.push((HOST_VAR, "not a host"));
        let config = load(&vars).unwrap();
        assert!(matches!(
            config.bind_addr().await.unwrap_err(),
            ConfigError::Invalid { name, .. } if name == HOST_VAR
        ));
    }
}
