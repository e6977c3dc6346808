//! Twilio webhook signature computation and verification.
//!
//! Twilio signs webhook requests using HMAC-SHA1 over the request URL
//! concatenated with the sorted body parameters, base64 encoded.
//! Reference: https://www.twilio.com/docs/usage/security#validating-requests

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the base64-encoded HMAC-SHA1 signature.
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Compute the Twilio signature for a request.
///
/// The signing base string is the full request URL followed by each body
/// field name immediately followed by its value, fields ordered by
/// byte-wise name sort. The result is deterministic: the same token, URL
/// and body always produce the same signature, and the same body signed
/// against two different URLs produces two different signatures.
pub fn compute_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> String {
    let mut data = String::from(url);
    // BTreeMap iterates in byte-wise key order, the sort order Twilio
    // uses for the signing base string.
    for (name, value) in params {
        data.push_str(name);
        data.push_str(value);
    }

    let mut mac =
        HmacSha1::new_from_slice(auth_token.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());

    base64_engine.encode(mac.finalize().into_bytes())
}

/// Verify the signature presented on an inbound webhook.
///
/// Recomputes the expected signature over the canonical URL and body
/// fields and compares in constant time. Returns `false` on any mismatch
/// or malformed input; never panics.
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    presented: &str,
) -> bool {
    if presented.is_empty() {
        warn!(url = url, "twilio_signature_missing");
        return false;
    }

    let expected = compute_signature(auth_token, url, params);

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected, presented);

    if !valid {
        warn!(
            url = url,
            expected_length = expected.len(),
            actual_length = presented.len(),
            "twilio_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let body = params(&[
            ("To", "+12065551212"),
            ("From", "+12065551211"),
            ("Body", "Test"),
        ]);
        let signature = compute_signature("token", "https://example.com/proxy", &body);

        assert!(verify_signature(
            "token",
            "https://example.com/proxy",
            &body,
            &signature
        ));
    }

    #[test]
    fn test_verify_rejects_every_single_character_mutation() {
        let body = params(&[("To", "+12065551212"), ("Body", "Test")]);
        let signature = compute_signature("token", "https://example.com/proxy", &body);

        for i in 0..signature.len() {
            let mut mutated: Vec<char> = signature.chars().collect();
            mutated[i] = if mutated[i] == 'A' { 'B' } else { 'A' };
            let mutated: String = mutated.into_iter().collect();

            assert!(
                !verify_signature("token", "https://example.com/proxy", &body, &mutated),
                "mutation at index {} should fail verification",
                i
            );
        }
    }

    #[test]
    fn test_signatures_differ_per_destination_url() {
        let body = params(&[("To", "+12065551212"), ("Body", "Test")]);

        let a = compute_signature("token", "https://a.example.com/webhook", &body);
        let b = compute_signature("token", "https://b.example.com/webhook", &body);

        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let body = params(&[("To", "+12065551212")]);

        let first = compute_signature("token", "https://example.com/proxy", &body);
        let second = compute_signature("token", "https://example.com/proxy", &body);

        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_rejects_wrong_token() {
        let body = params(&[("To", "+12065551212")]);
        let signature = compute_signature("token", "https://example.com/proxy", &body);

        assert!(!verify_signature(
            "other-token",
            "https://example.com/proxy",
            &body,
            &signature
        ));
    }

    #[test]
    fn test_verify_rejects_empty_signature() {
        let body = params(&[("To", "+12065551212")]);

        assert!(!verify_signature(
            "token",
            "https://example.com/proxy",
            &body,
            ""
        ));
    }

    #[test]
    fn test_empty_body_signs_url_only() {
        let body = BTreeMap::new();
        let signature = compute_signature("token", "https://example.com/proxy", &body);

        assert!(verify_signature(
            "token",
            "https://example.com/proxy",
            &body,
            &signature
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
