//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// One hostname label: alphanumeric with hyphens in the interior only
static HOSTNAME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap());

/// Validate a node name as passed to `--node`.
///
/// A node name doubles as the address the agent client dials, so it must be
/// a dot-separated hostname or an IPv4 literal: labels of at most 63
/// characters, no empty labels, hyphens only in the interior.
pub fn validate_certname(certname: &str) -> bool {
    !certname.is_empty()
        && certname.len() <= 255
        && certname
            .split('.')
            .all(|label| label.len() <= 63 && HOSTNAME_LABEL.is_match(label))
}

/// Validate a revision argument before handing it to git
///
/// Rejects the obviously malformed: whitespace, range syntax, option-like
/// strings. Resolution against the repository decides the rest.
pub fn validate_rev(rev: &str) -> bool {
    !rev.is_empty()
        && rev.len() <= 128
        && !rev.starts_with('-')
        && !rev.contains("..")
        && !rev.chars().any(|c| c.is_whitespace() || c == '~' || c == '^' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_certname_accepts_dialable_hosts() {
        assert!(validate_certname("web1.example.com"));
        assert!(validate_certname("127.0.0.1"));
        assert!(validate_certname("db-primary-01"));
    }

    #[test]
    fn test_validate_certname_rejects_malformed_hosts() {
        assert!(!validate_certname(""));
        assert!(!validate_certname("web1..example.com"));
        assert!(!validate_certname("-web1.example.com"));
        assert!(!validate_certname("web1-.example.com"));
        assert!(!validate_certname("web 1"));
        assert!(!validate_certname(&"a".repeat(256)));
    }

    #[test]
    fn test_validate_rev_valid() {
        assert!(validate_rev("v42"));
        assert!(validate_rev("release-2026.01"));
        assert!(validate_rev("9f2d5c1a7b3e4d6f9f2d5c1a7b3e4d6f9f2d5c1a"));
    }

    #[test]
    fn test_validate_rev_invalid() {
        assert!(!validate_rev(""));
        assert!(!validate_rev("v1..v2"));
        assert!(!validate_rev("--upload-pack=/bin/sh"));
        assert!(!validate_rev("HEAD~3"));
        assert!(!validate_rev("a rev"));
    }
}
