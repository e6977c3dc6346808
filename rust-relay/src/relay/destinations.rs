//! Destination routing table.
//!
//! Destinations are configured as a comma-delimited list. Each entry is
//! either a bare URL, which receives every relayed request, or
//! `number$$url`, which receives only requests whose routing key equals
//! the number exactly. List order is preserved into dispatch order.

use tracing::warn;
use url::Url;

/// Separates a scope number from its URL within one entry.
const SCOPE_DELIMITER: &str = "$$";

/// One routing rule. A rule without a scope number is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRule {
    pub url: String,
    pub scope: Option<String>,
}

/// Ordered destination rules parsed from configuration.
#[derive(Debug, Clone, Default)]
pub struct DestinationTable {
    rules: Vec<DestinationRule>,
}

impl DestinationTable {
    /// Parse a destination list, falling back to `defaults` when the
    /// configured string is absent or empty.
    ///
    /// Entries with an unparseable URL are logged but kept verbatim;
    /// routing never second-guesses configuration, the dispatch call
    /// surfaces the failure.
    pub fn parse(configured: Option<&str>, defaults: &[&str]) -> Self {
        let raw = match configured {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => defaults.join(","),
        };

        let mut rules = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let rule = match entry.split_once(SCOPE_DELIMITER) {
                Some((scope, url)) => DestinationRule {
                    url: url.to_string(),
                    scope: Some(scope.to_string()),
                },
                None => DestinationRule {
                    url: entry.to_string(),
                    scope: None,
                },
            };

            if Url::parse(&rule.url).is_err() {
                warn!(url = %rule.url, "destination_url_unparseable");
            }

            rules.push(rule);
        }

        Self { rules }
    }

    /// Resolve the ordered destination URLs for a routing key.
    ///
    /// Global rules always match; scoped rules match on exact string
    /// equality, with no phone number normalization. Insertion order is
    /// preserved and duplicates are not collapsed. An empty result is a
    /// valid outcome, not an error.
    pub fn resolve(&self, routing_key: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| match &rule.scope {
                None => true,
                Some(scope) => scope == routing_key,
            })
            .map(|rule| rule.url.as_str())
            .collect()
    }

    pub fn rules(&self) -> &[DestinationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &[&str] = &["https://default-a.example.com", "https://default-b.example.com"];

    #[test]
    fn test_parse_falls_back_to_defaults_when_absent() {
        let table = DestinationTable::parse(None, DEFAULTS);

        assert_eq!(table.resolve("+1555"), DEFAULTS.to_vec());
    }

    #[test]
    fn test_parse_falls_back_to_defaults_when_empty() {
        let table = DestinationTable::parse(Some("  "), DEFAULTS);

        assert_eq!(table.resolve("+1555"), DEFAULTS.to_vec());
    }

    #[test]
    fn test_parse_global_and_scoped_entries() {
        let table = DestinationTable::parse(
            Some("https://x.example.com,+1555$$https://y.example.com"),
            DEFAULTS,
        );

        assert_eq!(
            table.rules(),
            &[
                DestinationRule {
                    url: "https://x.example.com".to_string(),
                    scope: None,
                },
                DestinationRule {
                    url: "https://y.example.com".to_string(),
                    scope: Some("+1555".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_resolve_matching_key_preserves_order() {
        let table = DestinationTable::parse(
            Some("https://x.example.com,+1555$$https://y.example.com"),
            DEFAULTS,
        );

        assert_eq!(
            table.resolve("+1555"),
            vec!["https://x.example.com", "https://y.example.com"]
        );
    }

    #[test]
    fn test_resolve_unmatched_key_returns_globals_only() {
        let table = DestinationTable::parse(
            Some("https://x.example.com,+1555$$https://y.example.com"),
            DEFAULTS,
        );

        assert_eq!(table.resolve("+1999"), vec!["https://x.example.com"]);
    }

    #[test]
    fn test_resolve_is_case_sensitive_exact_match() {
        let table = DestinationTable::parse(Some("ABC$$https://y.example.com"), DEFAULTS);

        assert!(table.resolve("abc").is_empty());
        assert_eq!(table.resolve("ABC"), vec!["https://y.example.com"]);
    }

    #[test]
    fn test_resolve_keeps_duplicates() {
        let table = DestinationTable::parse(
            Some("https://x.example.com,https://x.example.com"),
            DEFAULTS,
        );

        assert_eq!(
            table.resolve(""),
            vec!["https://x.example.com", "https://x.example.com"]
        );
    }

    #[test]
    fn test_resolve_empty_result_is_valid() {
        let table = DestinationTable::parse(Some("+1555$$https://y.example.com"), DEFAULTS);

        assert!(table.resolve("+1999").is_empty());
    }

    #[test]
    fn test_parse_skips_empty_entries() {
        let table = DestinationTable::parse(Some("https://x.example.com,,"), DEFAULTS);

        assert_eq!(table.len(), 1);
    }
}
