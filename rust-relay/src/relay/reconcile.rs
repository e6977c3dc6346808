//! Downstream acknowledgement reconciliation.
//!
//! Each destination answers a relayed webhook with a TwiML document. The
//! reconciler parses every response body and compares the acknowledgement
//! structures for equivalence, so operators learn when downstream systems
//! start answering with custom TwiML. Divergence is a warning, never a
//! request failure: an accepted inbound message is always acknowledged.

use serde_json::json;

use crate::relay::dispatch::DispatchResult;
use crate::report::Reporter;

/// Parsed acknowledgement substructure of a downstream response.
///
/// Equality is structural: element name, attributes, non-whitespace text
/// and child elements in order. Byte-level differences such as the XML
/// declaration, self-closing tags or whitespace do not make two
/// envelopes distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckEnvelope {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<AckEnvelope>,
}

/// Parse a response body into its acknowledgement envelope.
///
/// Returns `None` when the body is not well-formed XML; unparseable
/// bodies form their own group during reconciliation.
pub fn parse_envelope(body: &str) -> Option<AckEnvelope> {
    let document = roxmltree::Document::parse(body).ok()?;
    Some(build(document.root_element()))
}

fn build(node: roxmltree::Node) -> AckEnvelope {
    let mut attributes: Vec<(String, String)> = node
        .attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();
    attributes.sort();

    let text = node
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let children = node
        .children()
        .filter(|child| child.is_element())
        .map(build)
        .collect();

    AckEnvelope {
        name: node.tag_name().name().to_string(),
        attributes,
        text,
        children,
    }
}

/// Outcome of comparing downstream acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Matching,
    Divergent,
}

#[derive(Debug)]
pub struct Reconciliation {
    pub status: AckStatus,
    /// Distinct envelopes in first-seen order. `None` marks bodies that
    /// did not parse as XML.
    pub groups: Vec<Option<AckEnvelope>>,
}

/// Compare the acknowledgement envelopes across all destination results.
///
/// Zero results reconcile vacuously as `Matching`. Destination order is
/// insignificant here even though dispatch preserves it: envelopes are
/// compared by value only. On divergence, every destination URL and its
/// raw body are handed to the reporter as warning context.
pub fn reconcile(results: &[DispatchResult], reporter: &dyn Reporter) -> Reconciliation {
    let mut groups: Vec<Option<AckEnvelope>> = Vec::new();
    for result in results {
        if !groups.contains(&result.envelope) {
            groups.push(result.envelope.clone());
        }
    }

    if groups.len() <= 1 {
        return Reconciliation {
            status: AckStatus::Matching,
            groups,
        };
    }

    let context = json!(results
        .iter()
        .map(|r| json!({ "url": r.url, "body": r.body }))
        .collect::<Vec<_>>());
    reporter.report_warning("destinations returned diverging acknowledgements", &context);

    Reconciliation {
        status: AckStatus::Divergent,
        groups,
    }
}
