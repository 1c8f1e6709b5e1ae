//! JWKS-backed JWT validation.
//!
//! [`JwksValidator`] verifies bearer tokens against keys published at a JSON
//! Web Key Set endpoint. Keys are cached by `kid`; a token naming an unknown
//! `kid` triggers one refresh of the set (key rotation), rate limited by
//! [`JwksValidatorBuilder::min_refresh_interval`]. Fetches are bounded by
//! [`JwksValidatorBuilder::fetch_timeout`], and any fetch failure surfaces as
//! [`OAuthError::JwksUnavailable`] rather than as a credential failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_oauth_server::oauth::{JwksValidator, TokenValidator};
//!
//! # async fn run() -> Result<(), mcp_oauth_server::BoxError> {
//! let validator = JwksValidator::builder("https://auth.example.com/.well-known/jwks.json")
//!     .expected_issuer("https://auth.example.com")
//!     .expected_audience("api://tools")
//!     .build()?;
//!
//! let claims = validator.validate_token("eyJ...").await?;
//! println!("hello {:?}", claims.sub);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tokio::sync::{Mutex, RwLock};

use super::error::OAuthError;
use super::token::{ClaimSet, TokenValidator};

/// Default upper bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default minimum spacing between two JWKS fetches.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Default clock skew tolerance for `exp`. Any token past its `exp` fails.
pub const DEFAULT_LEEWAY: Duration = Duration::ZERO;

/// Error building a [`JwksValidator`].
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to build JWKS HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("no signing algorithms allowed")]
    NoAlgorithms,
}

/// Keys from the last successful fetch.
#[derive(Default)]
struct KeyCache {
    by_kid: HashMap<String, DecodingKey>,
    unnamed: Vec<DecodingKey>,
    /// Bumped on every successful fetch.
    generation: u64,
}

impl KeyCache {
    fn from_jwk_set(set: &JwkSet) -> Result<Self, String> {
        let mut cache = KeyCache::default();
        for jwk in &set.keys {
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(kid = ?jwk.common.key_id, error = %e, "Skipping unusable JWK");
                    continue;
                }
            };
            match &jwk.common.key_id {
                Some(kid) => {
                    cache.by_kid.insert(kid.clone(), key);
                }
                None => cache.unnamed.push(key),
            }
        }
        if cache.is_empty() {
            return Err("JWKS contains no usable signing keys".to_string());
        }
        Ok(cache)
    }

    fn len(&self) -> usize {
        self.by_kid.len() + self.unnamed.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate keys for a token header `kid`.
    ///
    /// A named `kid` matches at most one key; a token without `kid` is tried
    /// against every key.
    fn candidates(&self, kid: Option<&str>) -> Option<Vec<DecodingKey>> {
        match kid {
            Some(kid) => self.by_kid.get(kid).map(|k| vec![k.clone()]),
            None if self.is_empty() => None,
            None => Some(
                self.by_kid
                    .values()
                    .chain(self.unnamed.iter())
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Bookkeeping for single-flight, rate-limited refreshes.
#[derive(Default)]
struct RefreshState {
    last_attempt: Option<Instant>,
    last_error: Option<String>,
}

struct Inner {
    jwks_uri: String,
    client: reqwest::Client,
    validation: Validation,
    algorithms: Vec<Algorithm>,
    min_refresh_interval: Duration,
    keys: RwLock<KeyCache>,
    refresh: Mutex<RefreshState>,
}

/// JWT validator backed by a remote JWKS.
///
/// Cheap to clone; clones share the key cache.
#[derive(Clone)]
pub struct JwksValidator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JwksValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksValidator")
            .field("jwks_uri", &self.inner.jwks_uri)
            .field("algorithms", &self.inner.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwksValidator {
    /// Start configuring a validator for the given JWKS URL.
    pub fn builder(jwks_uri: impl Into<String>) -> JwksValidatorBuilder {
        JwksValidatorBuilder::new(jwks_uri)
    }

    /// Fetch the key set now, ignoring the refresh interval.
    ///
    /// Returns the number of usable keys.
    pub async fn prefetch(&self) -> Result<usize, OAuthError> {
        let mut state = self.inner.refresh.lock().await;
        self.refresh_locked(&mut state).await
    }

    async fn cached(&self, kid: Option<&str>) -> (u64, Option<Vec<DecodingKey>>) {
        let keys = self.inner.keys.read().await;
        (keys.generation, keys.candidates(kid))
    }

    /// Refresh the key set unless another refresh happened recently.
    ///
    /// `seen` is the cache generation the caller found lacking. Concurrent
    /// callers queue on the refresh mutex; the first one fetches and the
    /// rest find a newer generation and return without fetching.
    async fn refresh_if_due(&self, seen: u64) -> Result<(), OAuthError> {
        let mut state = self.inner.refresh.lock().await;
        if self.inner.keys.read().await.generation != seen {
            return Ok(());
        }

        let due = state
            .last_attempt
            .is_none_or(|at| at.elapsed() >= self.inner.min_refresh_interval);

        if due {
            self.refresh_locked(&mut state).await.map(|_| ())
        } else if let Some(description) = &state.last_error {
            Err(OAuthError::JwksUnavailable {
                description: description.clone(),
            })
        } else {
            Ok(())
        }
    }

    async fn refresh_locked(&self, state: &mut RefreshState) -> Result<usize, OAuthError> {
        state.last_attempt = Some(Instant::now());
        match self.fetch().await {
            Ok(mut cache) => {
                let count = cache.len();
                let mut keys = self.inner.keys.write().await;
                cache.generation = keys.generation + 1;
                *keys = cache;
                drop(keys);
                state.last_error = None;
                tracing::debug!(uri = %self.inner.jwks_uri, keys = count, "Refreshed JWKS");
                Ok(count)
            }
            Err(description) => {
                tracing::warn!(uri = %self.inner.jwks_uri, error = %description, "JWKS fetch failed");
                state.last_error = Some(description.clone());
                Err(OAuthError::JwksUnavailable { description })
            }
        }
    }

    async fn fetch(&self) -> Result<KeyCache, String> {
        let response = self
            .inner
            .client
            .get(&self.inner.jwks_uri)
            .send()
            .await
            .map_err(|e| describe_fetch_error(&e))?
            .error_for_status()
            .map_err(|e| describe_fetch_error(&e))?;

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| format!("invalid JWKS document: {}", e))?;

        KeyCache::from_jwk_set(&set)
    }

    /// Candidate keys for `kid` with the cache generation they came from.
    async fn keys_for(&self, kid: Option<&str>) -> Result<(u64, Vec<DecodingKey>), OAuthError> {
        let (seen, keys) = self.cached(kid).await;
        if let Some(keys) = keys {
            return Ok((seen, keys));
        }

        // Unknown kid (or empty cache): the set may have rotated.
        self.refresh_if_due(seen).await?;

        match self.cached(kid).await {
            (generation, Some(keys)) => Ok((generation, keys)),
            (_, None) => Err(OAuthError::InvalidToken {
                description: match kid {
                    Some(kid) => format!("no key in the JWKS matches kid '{}'", kid),
                    None => "no key in the JWKS verifies the token".to_string(),
                },
            }),
        }
    }

    /// Try each key in turn. `Ok(None)` means no key matched the signature.
    fn decode_with(
        &self,
        token: &str,
        keys: &[DecodingKey],
        validation: &Validation,
    ) -> Result<Option<ClaimSet>, OAuthError> {
        for key in keys {
            match jsonwebtoken::decode::<ClaimSet>(token, key, validation) {
                Ok(data) => return Ok(Some(data.claims)),
                // Wrong key for this token; try the next candidate.
                Err(e) if is_key_mismatch(&e) => continue,
                Err(e) => return Err(map_decode_error(e)),
            }
        }
        Ok(None)
    }
}

impl TokenValidator for JwksValidator {
    async fn validate_token(&self, token: &str) -> Result<ClaimSet, OAuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(map_decode_error)?;

        if !self.inner.algorithms.contains(&header.alg) {
            return Err(OAuthError::InvalidToken {
                description: format!("algorithm {:?} is not allowed", header.alg),
            });
        }

        let kid = header.kid.as_deref();
        let (generation, keys) = self.keys_for(kid).await?;

        let mut validation = self.inner.validation.clone();
        validation.algorithms = vec![header.alg];

        if let Some(claims) = self.decode_with(token, &keys, &validation)? {
            return Ok(claims);
        }

        // Without a kid a rotated signer only shows up as a signature miss.
        if kid.is_none() {
            self.refresh_if_due(generation).await?;
            let (latest, keys) = self.keys_for(None).await?;
            if latest != generation {
                if let Some(claims) = self.decode_with(token, &keys, &validation)? {
                    return Ok(claims);
                }
            }
        }

        Err(OAuthError::InvalidToken {
            description: "signature does not verify against any key in the JWKS".to_string(),
        })
    }
}

/// Builder for [`JwksValidator`].
#[derive(Debug, Clone)]
pub struct JwksValidatorBuilder {
    jwks_uri: String,
    issuer: Option<String>,
    audience: Option<String>,
    algorithms: Vec<Algorithm>,
    leeway: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
    validate_exp: bool,
}

impl JwksValidatorBuilder {
    fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            issuer: None,
            audience: None,
            algorithms: vec![Algorithm::RS256],
            leeway: DEFAULT_LEEWAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            validate_exp: true,
        }
    }

    /// Require `iss` to equal `issuer`.
    pub fn expected_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require `aud` to contain `audience`.
    ///
    /// Without this call the audience is not checked.
    pub fn expected_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Like [`expected_audience`](Self::expected_audience), but a `None`
    /// leaves the audience check disabled.
    pub fn maybe_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Signing algorithms accepted in token headers. Default: `RS256`.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Clock skew tolerance applied to `exp`.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Upper bound on one JWKS fetch, connect through body.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Minimum spacing between fetches triggered by unknown `kid`s.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Disable expiration validation.
    ///
    /// Use with caution -- tokens without expiration checks may be reused
    /// indefinitely.
    pub fn disable_exp_validation(mut self) -> Self {
        self.validate_exp = false;
        self
    }

    /// Build the validator. Performs no I/O; keys are fetched on first use
    /// or by [`JwksValidator::prefetch`].
    pub fn build(self) -> Result<JwksValidator, JwksError> {
        let Some(&first) = self.algorithms.first() else {
            return Err(JwksError::NoAlgorithms);
        };

        let client = reqwest::Client::builder()
            .timeout(self.fetch_timeout)
            .build()?;

        let mut validation = Validation::new(first);
        validation.leeway = self.leeway.as_secs();
        validation.validate_exp = self.validate_exp;

        let mut required = Vec::new();
        if self.validate_exp {
            required.push("exp");
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&required);

        Ok(JwksValidator {
            inner: Arc::new(Inner {
                jwks_uri: self.jwks_uri,
                client,
                validation,
                algorithms: self.algorithms,
                min_refresh_interval: self.min_refresh_interval,
                keys: RwLock::new(KeyCache::default()),
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }
}

fn describe_fetch_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out fetching JWKS: {}", err)
    } else {
        format!("failed to fetch JWKS: {}", err)
    }
}

fn is_key_mismatch(err: &jsonwebtoken::errors::Error) -> bool {
    use jsonwebtoken::errors::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm
    )
}

/// Map a `jsonwebtoken` failure onto the credential errors callers see.
pub(crate) fn map_decode_error(err: jsonwebtoken::errors::Error) -> OAuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => OAuthError::ExpiredToken,
        ErrorKind::InvalidAudience => OAuthError::InvalidAudience,
        ErrorKind::InvalidIssuer => OAuthError::InvalidIssuer,
        _ => OAuthError::InvalidToken {
            description: err.to_string(),
        },
    }
}
