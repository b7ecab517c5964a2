//! URL allow/deny filtering for agent-initiated navigation.
//!
//! Two independent checks, in order: a fixed deny-list of URL prefixes that
//! rejects regardless of any allow configuration, then an allow check that is
//! open-by-default until the caller configures at least one pattern.

use serde::Deserialize;
use serde::Serialize;
use wildmatch::WildMatch;

/// URL prefixes rejected outright: local-file access, script-injection URIs,
/// and unsafe browser-internal settings pages.
const BLOCKED_URL_PREFIXES: [&str; 6] = [
    "file://",
    "javascript:",
    "vbscript:",
    "chrome://settings",
    "chrome://extensions",
    "edge://settings",
];

/// Always-available destinations: the blank/new-tab pages plus a small set of
/// trusted domains. Unioned with user patterns once any are configured.
const DEFAULT_ALLOWED_PATTERNS: [&str; 4] = [
    "about:blank",
    "chrome://newtab",
    "https://www.google.com",
    "https://duckduckgo.com",
];

/// Outcome of classifying one target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum UrlDecision {
    Allowed,
    /// Matched the fixed deny-list. Never allowed, independent of any allow
    /// configuration.
    Blocked { prefix: String },
    /// Patterns are configured and none matched.
    Unmatched,
}

impl UrlDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Classifies target URLs against the fixed deny-list and the configured
/// allow patterns.
///
/// Pattern syntax: literal text with `*` meaning "any characters here",
/// matched case-insensitively and anchored as a prefix (the URL must begin
/// with the expanded pattern, not equal it).
#[derive(Debug)]
pub struct UrlGuard {
    /// Compiled matchers; empty means open-by-default.
    matchers: Vec<WildMatch>,
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl UrlGuard {
    /// Build a guard from the user-configured patterns. With zero patterns
    /// every non-blocked URL is accepted; otherwise the effective set is the
    /// fixed defaults unioned with the user patterns.
    pub fn new(user_patterns: &[String]) -> Self {
        let matchers = if user_patterns.is_empty() {
            Vec::new()
        } else {
            DEFAULT_ALLOWED_PATTERNS
                .iter()
                .copied()
                .chain(user_patterns.iter().map(String::as_str))
                .map(compile_prefix_pattern)
                .collect()
        };
        Self { matchers }
    }

    /// Classify one URL. The block check runs first and is final.
    pub fn evaluate(&self, url: &str) -> UrlDecision {
        let lowered = url.to_ascii_lowercase();
        for prefix in BLOCKED_URL_PREFIXES {
            if lowered.starts_with(prefix) {
                tracing::debug!(url, prefix, "blocked url");
                return UrlDecision::Blocked {
                    prefix: prefix.to_string(),
                };
            }
        }
        if self.matchers.is_empty() {
            return UrlDecision::Allowed;
        }
        if self.matchers.iter().any(|m| m.matches(&lowered)) {
            UrlDecision::Allowed
        } else {
            tracing::debug!(url, "url matched no allow pattern");
            UrlDecision::Unmatched
        }
    }
}

/// Compile one pattern to a case-insensitive prefix-anchored matcher: lower
/// the case and append a trailing wildcard so "begins with" semantics fall
/// out of whole-string matching.
fn compile_prefix_pattern(pattern: &str) -> WildMatch {
    WildMatch::new(&format!("{}*", pattern.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(patterns: &[&str]) -> UrlGuard {
        UrlGuard::new(&patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_local_file_access_is_always_rejected() {
        // Open-by-default configuration.
        let open = UrlGuard::default();
        assert!(matches!(
            open.evaluate("file:///etc/passwd"),
            UrlDecision::Blocked { .. }
        ));

        // Even an allow pattern covering it cannot rescue a blocked URL.
        let configured = guard(&["file://*"]);
        assert!(matches!(
            configured.evaluate("file:///etc/passwd"),
            UrlDecision::Blocked { .. }
        ));
    }

    #[test]
    fn test_block_check_is_case_insensitive() {
        let g = UrlGuard::default();
        assert!(matches!(
            g.evaluate("FILE:///etc/passwd"),
            UrlDecision::Blocked { .. }
        ));
        assert!(matches!(
            g.evaluate("JavaScript:alert(1)"),
            UrlDecision::Blocked { .. }
        ));
        assert!(matches!(
            g.evaluate("chrome://SETTINGS/privacy"),
            UrlDecision::Blocked { .. }
        ));
    }

    #[test]
    fn test_open_by_default_without_patterns() {
        let g = UrlGuard::default();
        assert_eq!(g.evaluate("https://anything.example"), UrlDecision::Allowed);
        assert_eq!(g.evaluate("http://plain.example/path"), UrlDecision::Allowed);
    }

    #[test]
    fn test_wildcard_pattern_accepts_and_rejects() {
        let g = guard(&["https://*.test.org"]);
        assert_eq!(
            g.evaluate("https://sub.test.org/path"),
            UrlDecision::Allowed
        );
        assert_eq!(g.evaluate("https://blocked.com"), UrlDecision::Unmatched);
    }

    #[test]
    fn test_patterns_are_prefix_anchored_not_full_match() {
        let g = guard(&["https://docs.example.org"]);
        assert_eq!(
            g.evaluate("https://docs.example.org/guides/intro"),
            UrlDecision::Allowed
        );
        // The pattern is a prefix of the URL, not a substring anywhere.
        assert_eq!(
            g.evaluate("https://evil.example/https://docs.example.org"),
            UrlDecision::Unmatched
        );
    }

    #[test]
    fn test_allow_check_is_case_insensitive() {
        let g = guard(&["https://Docs.Example.org"]);
        assert_eq!(
            g.evaluate("HTTPS://DOCS.EXAMPLE.ORG/page"),
            UrlDecision::Allowed
        );
    }

    #[test]
    fn test_defaults_are_unioned_with_user_patterns() {
        let g = guard(&["https://internal.corp"]);
        // The configured pattern works.
        assert_eq!(
            g.evaluate("https://internal.corp/dash"),
            UrlDecision::Allowed
        );
        // The fixed defaults stay reachable.
        assert_eq!(g.evaluate("about:blank"), UrlDecision::Allowed);
        assert_eq!(g.evaluate("chrome://newtab"), UrlDecision::Allowed);
        assert_eq!(
            g.evaluate("https://www.google.com/search?q=x"),
            UrlDecision::Allowed
        );
        // Everything else needs a pattern now.
        assert_eq!(g.evaluate("https://other.example"), UrlDecision::Unmatched);
    }

    #[test]
    fn test_decision_serialization() {
        let blocked = UrlDecision::Blocked {
            prefix: "file://".to_string(),
        };
        let json = serde_json::to_string(&blocked).unwrap();
        let back: UrlDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blocked);
        assert!(json.contains("\"blocked\""));
    }
}
