//! Inbound request normalization.
//!
//! Rebuilds the canonical request Twilio signed from the raw transport
//! event. The transport sub-object and the `host` header are stripped,
//! and the canonical URL is reconstructed from the configured domain and
//! path rather than the received host header, which intermediary
//! infrastructure may rewrite.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

/// Body field carrying the transport metadata sub-object.
const TRANSPORT_FIELD: &str = "request";

/// Body field used as the routing key: the message's destination number.
const ROUTING_KEY_FIELD: &str = "To";

/// Raw webhook event as received from the transport.
///
/// `fields` may carry nested values (the transport metadata object);
/// only flat string fields survive normalization.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub headers: HashMap<String, String>,
    pub fields: Map<String, Value>,
}

/// Normalized inbound request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Inbound headers minus `host`, keys lowercased by the transport.
    pub headers: HashMap<String, String>,
    /// Flat scalar body fields, ordered by name.
    pub body: BTreeMap<String, String>,
    /// The `To` field, or empty when absent.
    pub routing_key: String,
}

/// Rebuild the canonical signed form of a raw event.
///
/// Returns the cleaned request and the canonical URL the inbound
/// signature was computed against. The raw event is never mutated.
/// There is no failure path: a malformed event normalizes to empty
/// fields, which signature verification then rejects.
pub fn normalize(raw: &RawEvent, domain: &str, path: &str) -> (InboundRequest, String) {
    let canonical_url = format!("https://{}{}", domain, path);

    let mut headers = raw.headers.clone();
    headers.remove("host");

    let mut body = BTreeMap::new();
    for (name, value) in &raw.fields {
        if name == TRANSPORT_FIELD {
            continue;
        }
        // Twilio signs only the flat scalar fields; structured values are
        // not part of the canonical form.
        if let Value::String(value) = value {
            body.insert(name.clone(), value.clone());
        }
    }

    let routing_key = body.get(ROUTING_KEY_FIELD).cloned().unwrap_or_default();

    (
        InboundRequest {
            headers,
            body,
            routing_key,
        },
        canonical_url,
    )
}
