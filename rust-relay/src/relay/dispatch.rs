//! Fan-out dispatcher for relayed webhooks.
//!
//! Sends the normalized payload to each resolved destination with a
//! freshly computed per-destination signature. Two disciplines exist:
//! concurrent for independent destinations, and strictly sequential for
//! deployments where a later destination has side effects on resources
//! an earlier destination still needs.

use std::str::FromStr;

use futures::future::try_join_all;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::relay::normalize::InboundRequest;
use crate::relay::reconcile::{parse_envelope, AckEnvelope};
use crate::web::signature::{compute_signature, SIGNATURE_HEADER};

/// Deployment-time choice between concurrent and strictly sequential
/// outbound delivery. One value per process, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    #[default]
    Concurrent,
    Sequential,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concurrent" => Ok(DispatchMode::Concurrent),
            "sequential" => Ok(DispatchMode::Sequential),
            other => Err(format!("unknown dispatch mode: {}", other)),
        }
    }
}

/// Terminal dispatch failures. Any variant aborts the invocation; no
/// retries are performed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("destination {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to encode form body: {0}")]
    Encoding(#[from] serde_urlencoded::ser::Error),
}

/// One completed destination call, collected only for reconciliation.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Parsed acknowledgement, `None` when the body was not XML.
    pub envelope: Option<AckEnvelope>,
}

/// Send the normalized payload to every destination URL.
///
/// Fails fast: the first non-2xx response or transport error fails the
/// whole call. In sequential mode no further destination is attempted;
/// in concurrent mode other in-flight calls may complete but their
/// results are not surfaced.
pub async fn dispatch(
    client: &Client,
    mode: DispatchMode,
    urls: &[&str],
    inbound: &InboundRequest,
    auth_token: &str,
) -> Result<Vec<DispatchResult>, DispatchError> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let form_body = serde_urlencoded::to_string(&inbound.body)?;

    match mode {
        DispatchMode::Concurrent => {
            let calls: Vec<_> = urls
                .iter()
                .map(|url| send_one(client, url, inbound, &form_body, auth_token))
                .collect();
            try_join_all(calls).await
        }
        DispatchMode::Sequential => {
            let mut results = Vec::with_capacity(urls.len());
            for url in urls {
                // Each call is awaited to completion before the next one
                // starts; a failure stops the remaining destinations.
                results.push(send_one(client, url, inbound, &form_body, auth_token).await?);
            }
            Ok(results)
        }
    }
}

/// Send one re-signed copy of the payload to a single destination.
///
/// Headers are cloned from the inbound request with the signature header
/// replaced by one computed for this destination's URL; framing headers
/// are recomputed by the client.
async fn send_one(
    client: &Client,
    url: &str,
    inbound: &InboundRequest,
    form_body: &str,
    auth_token: &str,
) -> Result<DispatchResult, DispatchError> {
    let signature = compute_signature(auth_token, url, &inbound.body);

    let mut request = client
        .post(url)
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .header(SIGNATURE_HEADER, &signature)
        .body(form_body.to_string());

    for (name, value) in &inbound.headers {
        if name == SIGNATURE_HEADER || name == "content-length" || name == "content-type" {
            continue;
        }
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|source| DispatchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| DispatchError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !status.is_success() {
        return Err(DispatchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    info!(
        url = url,
        status = status.as_u16(),
        body_length = body.len(),
        "relay_destination_sent"
    );

    let envelope = parse_envelope(&body);

    Ok(DispatchResult {
        url: url.to_string(),
        status: status.as_u16(),
        body,
        envelope,
    })
}
