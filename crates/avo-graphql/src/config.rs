//! Backend connection configuration.

use avo_core::defaults;

/// Configuration for the Hasura GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlConfig {
    /// Full GraphQL endpoint URL.
    pub url: String,
    /// `x-hasura-admin-secret` header value (server-side use only).
    pub admin_secret: Option<String>,
    /// Bearer token for user-scoped requests.
    pub bearer_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GraphQlConfig {
    fn default() -> Self {
        Self {
            url: defaults::GRAPHQL_URL.to_string(),
            admin_secret: None,
            bearer_token: None,
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

impl GraphQlConfig {
    /// Read `AVO_GRAPHQL_URL`, `AVO_GRAPHQL_ADMIN_SECRET`, `AVO_GRAPHQL_TOKEN`
    /// and `AVO_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("AVO_GRAPHQL_URL")
                .unwrap_or_else(|_| defaults::GRAPHQL_URL.to_string()),
            admin_secret: std::env::var("AVO_GRAPHQL_ADMIN_SECRET").ok(),
            bearer_token: std::env::var("AVO_GRAPHQL_TOKEN").ok(),
            timeout_seconds: timeout_from_env(),
        }
    }
}

/// Configuration for the REST proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token identifying the acting user.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::PROXY_URL.to_string(),
            token: None,
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

impl ProxyConfig {
    /// Read `AVO_PROXY_URL`, `AVO_PROXY_TOKEN` and `AVO_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("AVO_PROXY_URL")
                .unwrap_or_else(|_| defaults::PROXY_URL.to_string()),
            token: std::env::var("AVO_PROXY_TOKEN").ok(),
            timeout_seconds: timeout_from_env(),
        }
    }
}

fn timeout_from_env() -> u64 {
    std::env::var("AVO_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(defaults::HTTP_TIMEOUT_SECS)
}
