//! Web server module for the relay endpoints.
//!
//! This module provides the HTTP surface of the relay:
//! - Receives signed Twilio webhooks on /proxy and /proxy-status
//! - Verifies the inbound HMAC-SHA1 signature
//! - Fans the payload out to the configured destinations
//! - Acknowledges Twilio with the empty TwiML document

pub mod handlers;
pub mod signature;

pub use handlers::{
    health, proxy_status_webhook, proxy_webhook, relay_webhook, AppState, HealthResponse,
    RelayError, EMPTY_TWIML,
};
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
