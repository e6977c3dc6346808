//! Webhook relay endpoint handlers.
//!
//! Each relay handler runs one request through the full pipeline:
//! 1. Rebuild the canonical request and verify the Twilio signature
//! 2. Resolve the destinations for the message's To number
//! 3. Re-sign and forward the payload to every destination
//! 4. Reconcile the downstream TwiML and acknowledge the caller
//!
//! Verification and dispatch failures are recovered here and turned into
//! structured error responses; nothing propagates as a panic.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{RawForm, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_PROXY_DESTINATIONS, DEFAULT_PROXY_STATUS_DESTINATIONS};
use crate::relay::destinations::DestinationTable;
use crate::relay::dispatch::{dispatch, DispatchError};
use crate::relay::normalize::{normalize, RawEvent};
use crate::relay::reconcile::reconcile;
use crate::report::Reporter;
use crate::web::signature::{verify_signature, SIGNATURE_HEADER};

/// Empty TwiML acknowledgement returned for every accepted webhook.
pub const EMPTY_TWIML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response/>";

/// Terminal relay failures, one per request lifecycle.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request HMAC-SHA1 signature")]
    InvalidSignature,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
    pub proxy_destinations: Arc<DestinationTable>,
    pub proxy_status_destinations: Arc<DestinationTable>,
}

impl AppState {
    pub fn new(config: Config, client: reqwest::Client, reporter: Arc<dyn Reporter>) -> Self {
        let proxy_destinations = Arc::new(DestinationTable::parse(
            config.proxy_destinations.as_deref(),
            DEFAULT_PROXY_DESTINATIONS,
        ));
        let proxy_status_destinations = Arc::new(DestinationTable::parse(
            config.proxy_status_destinations.as_deref(),
            DEFAULT_PROXY_STATUS_DESTINATIONS,
        ));

        Self {
            config: Arc::new(config),
            client,
            reporter,
            proxy_destinations,
            proxy_status_destinations,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Relay Webhooks
// =============================================================================

/// Inbound message webhook endpoint.
pub async fn proxy_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Response {
    let path = state.config.proxy_path.clone();
    let table = state.proxy_destinations.clone();
    relay_response(&state, &path, &table, &headers, &body).await
}

/// Delivery status callback endpoint. Same pipeline as the message
/// webhook, with its own canonical path and destination table.
pub async fn proxy_status_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Response {
    let path = state.config.proxy_status_path.clone();
    let table = state.proxy_status_destinations.clone();
    relay_response(&state, &path, &table, &headers, &body).await
}

/// Convert the pipeline's completion into an HTTP response.
async fn relay_response(
    state: &AppState,
    path: &str,
    table: &DestinationTable,
    headers: &HeaderMap,
    form_body: &[u8],
) -> Response {
    match relay_webhook(state, path, table, headers, form_body).await {
        Ok(twiml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/xml")],
            twiml,
        )
            .into_response(),
        Err(err @ RelayError::InvalidSignature) => {
            (StatusCode::FORBIDDEN, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

/// Run the relay pipeline for one inbound webhook.
///
/// Exactly one completion per invocation: the empty TwiML on success or
/// the terminal error, mirrored to the reporter.
pub async fn relay_webhook(
    state: &AppState,
    path: &str,
    table: &DestinationTable,
    headers: &HeaderMap,
    form_body: &[u8],
) -> Result<&'static str, RelayError> {
    let _transaction = state
        .reporter
        .start_transaction("handle_incoming_twilio_webhook");

    let raw = raw_event_from_parts(headers, form_body);
    let (inbound, canonical_url) = normalize(&raw, &state.config.domain_name, path);

    let presented = inbound
        .headers
        .get(SIGNATURE_HEADER)
        .cloned()
        .unwrap_or_default();

    if !verify_signature(
        &state.config.auth_token,
        &canonical_url,
        &inbound.body,
        &presented,
    ) {
        warn!(url = %canonical_url, "Invalid request HMAC-SHA1 signature");
        state.reporter.report_exception(&RelayError::InvalidSignature);
        return Err(RelayError::InvalidSignature);
    }
    info!(url = %canonical_url, "Valid request HMAC-SHA1 signature");

    let urls = table.resolve(&inbound.routing_key);
    info!(
        routing_key = %inbound.routing_key,
        destinations = urls.len(),
        "relay_destinations_resolved"
    );

    let results = match dispatch(
        &state.client,
        state.config.dispatch_mode,
        &urls,
        &inbound,
        &state.config.auth_token,
    )
    .await
    {
        Ok(results) => results,
        Err(err) => {
            state.reporter.report_exception(&err);
            return Err(RelayError::Dispatch(err));
        }
    };

    let reconciliation = reconcile(&results, state.reporter.as_ref());
    info!(
        destinations = results.len(),
        ack_status = ?reconciliation.status,
        "relay_acknowledged"
    );

    Ok(EMPTY_TWIML)
}

/// Build the raw transport event from the HTTP parts.
fn raw_event_from_parts(headers: &HeaderMap, form_body: &[u8]) -> RawEvent {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(form_body).unwrap_or_default();

    let mut fields = serde_json::Map::new();
    for (name, value) in pairs {
        fields.insert(name, serde_json::Value::String(value));
    }

    RawEvent { headers, fields }
}
