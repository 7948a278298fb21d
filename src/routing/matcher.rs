//! Request matching primitives.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match path prefix (case-sensitive)
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive and works on the raw path
//! - No regex to guarantee O(n) matching

/// Matches the Host header of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    pub fn host(&self) -> &str {
        &self.expected_host
    }

    /// `host` is the raw header value, possibly carrying a port.
    pub fn matches(&self, host: &str) -> bool {
        strip_port(host).eq_ignore_ascii_case(&self.expected_host)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Length used to rank overlapping prefixes.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal: keep the brackets, drop the port.
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
