//! Tool server with JWKS-verified bearer authentication.
//!
//! Configuration comes from the environment (see [`Config`]):
//!
//! ```bash
//! OAUTH_JWKS_URI=https://auth.example.com/oauth2/default/v1/keys \
//! OAUTH_ISSUER=https://auth.example.com/oauth2/default \
//! OAUTH_AUDIENCE=api://default \
//! OAUTH_WELL_KNOWN_URL=https://auth.example.com/.well-known/oauth-authorization-server \
//! cargo run
//!
//! curl -X POST http://localhost:8000/mcp \
//!   -H "Content-Type: application/json" \
//!   -H "Authorization: Bearer <access-token>" \
//!   -d '{"tool": "add", "arguments": {"a": 2, "b": 3}}'
//! ```

use mcp_oauth_server::{
    BoxError, Config, Dispatcher, HttpTransport, JwksValidator, ToolRegistry, tools,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mcp_oauth_server=info")),
        )
        .init();

    let config = Config::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;
    let addr = config.bind_addr().await?;

    let validator = JwksValidator::builder(&config.jwks_uri)
        .expected_issuer(&config.issuer)
        .maybe_audience(config.audience.clone())
        .fetch_timeout(config.jwks_timeout)
        .build()?;
    if config.audience.is_none() {
        tracing::warn!("OAUTH_AUDIENCE is not set; token audience will not be checked");
    }

    // Warm the key cache; tokens still trigger a refresh if this fails.
    match validator.prefetch().await {
        Ok(keys) => tracing::info!(keys, jwks_uri = %config.jwks_uri, "Loaded signing keys"),
        Err(e) => {
            tracing::warn!(error = %e, jwks_uri = %config.jwks_uri, "Initial JWKS fetch failed")
        }
    }

    let registry = ToolRegistry::with_tools(tools::all()?)?;
    tracing::info!(tools = ?registry.names(), "Registered tools");

    HttpTransport::new(Dispatcher::new(registry), validator, config.well_known_url)
        .path(config.mcp_path)
        .serve(addr)
        .await?;

    Ok(())
}
