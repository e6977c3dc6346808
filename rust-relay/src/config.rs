//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables with documented
//! defaults. The dispatch discipline and the destination tables are
//! deployment-time policy: fixed per process, never per request.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::relay::dispatch::DispatchMode;

/// Default destinations for relayed inbound messages.
pub const DEFAULT_PROXY_DESTINATIONS: &[&str] = &[
    "https://api.kustomerapp.com/v1/twilio/webhooks/messages",
    "https://api.iterable.com/twilio/inbound",
];

/// Default destinations for relayed delivery status callbacks.
pub const DEFAULT_PROXY_STATUS_DESTINATIONS: &[&str] = &[
    "https://api.kustomerapp.com/v1/twilio/webhooks/messagestatus",
    "https://api.iterable.com/twilio/statusCallback",
];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Twilio auth token used to verify and re-sign webhook signatures
    pub auth_token: String,

    /// Domain this relay is reachable at; the canonical URL for signature
    /// verification is rebuilt from it, never from the host header
    pub domain_name: String,

    /// Path of the message webhook, appended to the domain
    pub proxy_path: String,

    /// Path of the status callback webhook
    pub proxy_status_path: String,

    /// Raw destination list for inbound messages (defaults apply when unset)
    pub proxy_destinations: Option<String>,

    /// Raw destination list for status callbacks
    pub proxy_status_destinations: Option<String>,

    /// Outbound delivery discipline for this deployment
    pub dispatch_mode: DispatchMode,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let auth_token = env::var("TWILIO_AUTH_TOKEN").unwrap_or_default();
        if auth_token.is_empty() {
            warn!("auth_token_not_configured");
        }

        let domain_name = env::var("DOMAIN_NAME").unwrap_or_default();
        if domain_name.is_empty() {
            warn!("domain_name_not_configured");
        }

        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            auth_token,

            domain_name,

            proxy_path: env::var("PROXY_PATH").unwrap_or_else(|_| "/proxy".to_string()),

            proxy_status_path: env::var("PROXY_STATUS_PATH")
                .unwrap_or_else(|_| "/proxy-status".to_string()),

            proxy_destinations: env::var("PROXY_DESTINATIONS").ok(),

            proxy_status_destinations: env::var("PROXY_STATUS_DESTINATIONS").ok(),

            dispatch_mode: parse_dispatch_mode("DISPATCH_MODE"),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}

/// Parse the dispatch mode, falling back to concurrent on bad input.
fn parse_dispatch_mode(name: &str) -> DispatchMode {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return DispatchMode::default(),
    };

    match DispatchMode::from_str(&raw) {
        Ok(mode) => mode,
        Err(e) => {
            warn!(env_var = name, value = %raw, error = %e, "Invalid dispatch mode, using default");
            DispatchMode::default()
        }
    }
}
