//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every location resolves to exactly one origin
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::uri::Authority;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::config::schema::{LocationConfig, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    DuplicateHost(String),
    InvalidPrefix { server: String, prefix: String },
    NestedPrefix { parent: String, child: String },
    ConflictingOrigin { server: String, prefix: String },
    MissingOrigin { server: String, prefix: String },
    InvalidUpstream { prefix: String, upstream: String },
    CacheWithoutUpstream { server: String, prefix: String },
    ZeroChunkSize,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(a) => write!(f, "invalid bind address '{}'", a),
            ValidationError::InvalidMetricsAddress(a) => {
                write!(f, "invalid metrics address '{}'", a)
            }
            ValidationError::DuplicateHost(h) => write!(f, "duplicate server host '{}'", h),
            ValidationError::InvalidPrefix { server, prefix } => {
                write!(f, "server '{}': path prefix '{}' must start with '/'", server, prefix)
            }
            ValidationError::NestedPrefix { parent, child } => {
                write!(f, "nested location '{}' does not extend '{}'", child, parent)
            }
            ValidationError::ConflictingOrigin { server, prefix } => write!(
                f,
                "server '{}': location '{}' sets both root and upstream",
                server, prefix
            ),
            ValidationError::MissingOrigin { server, prefix } => write!(
                f,
                "server '{}': location '{}' has no root or upstream",
                server, prefix
            ),
            ValidationError::InvalidUpstream { prefix, upstream } => {
                write!(f, "location '{}': invalid upstream '{}'", prefix, upstream)
            }
            ValidationError::CacheWithoutUpstream { server, prefix } => write!(
                f,
                "server '{}': location '{}' enables cache without an upstream",
                server, prefix
            ),
            ValidationError::ZeroChunkSize => write!(f, "static_files.read_chunk_size must be > 0"),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.static_files.read_chunk_size == 0 {
        errors.push(ValidationError::ZeroChunkSize);
    }

    let mut hosts = Vec::new();
    for server in &config.servers {
        let host = server.host.as_deref().map(str::to_ascii_lowercase);
        if hosts.contains(&host) {
            errors.push(ValidationError::DuplicateHost(
                host.clone().unwrap_or_else(|| "<default>".to_string()),
            ));
        }
        hosts.push(host);

        for location in &server.locations {
            validate_location(&server.name, location, None, false, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_location(
    server: &str,
    location: &LocationConfig,
    parent: Option<&str>,
    inherited_origin: bool,
    errors: &mut Vec<ValidationError>,
) {
    let prefix = &location.path_prefix;

    if !prefix.starts_with('/') {
        errors.push(ValidationError::InvalidPrefix {
            server: server.to_string(),
            prefix: prefix.clone(),
        });
    }

    if let Some(parent) = parent {
        if !prefix.starts_with(parent) {
            errors.push(ValidationError::NestedPrefix {
                parent: parent.to_string(),
                child: prefix.clone(),
            });
        }
    }

    if location.root.is_some() && location.upstream.is_some() {
        errors.push(ValidationError::ConflictingOrigin {
            server: server.to_string(),
            prefix: prefix.clone(),
        });
    }

    if let Some(upstream) = &location.upstream {
        if Authority::from_str(upstream).is_err() || upstream.is_empty() {
            errors.push(ValidationError::InvalidUpstream {
                prefix: prefix.clone(),
                upstream: upstream.clone(),
            });
        }
    }

    if location.cache == Some(true) && location.root.is_some() {
        errors.push(ValidationError::CacheWithoutUpstream {
            server: server.to_string(),
            prefix: prefix.clone(),
        });
    }

    let has_origin = inherited_origin || location.root.is_some() || location.upstream.is_some();
    if !has_origin {
        errors.push(ValidationError::MissingOrigin {
            server: server.to_string(),
            prefix: prefix.clone(),
        });
    }

    for child in &location.locations {
        validate_location(server, child, Some(prefix), has_origin, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;

    fn server(locations: Vec<LocationConfig>) -> ServerConfig {
        ServerConfig {
            name: "s".into(),
            host: None,
            flv_filter: None,
            locations,
        }
    }

    fn root(prefix: &str) -> LocationConfig {
        let mut l = LocationConfig::new(prefix);
        l.root = Some("/srv".into());
        l
    }

    #[test]
    fn test_valid_config() {
        let mut config = ProxyConfig::default();
        let mut parent = root("/videos/");
        let mut child = LocationConfig::new("/videos/live/");
        child.upstream = Some("127.0.0.1:3000".into());
        child.cache = Some(true);
        parent.locations.push(child);
        config.servers.push(server(vec![parent]));

        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.static_files.read_chunk_size = 0;

        let mut both = root("/both/");
        both.upstream = Some("127.0.0.1:1".into());
        let neither = LocationConfig::new("/neither/");
        let mut bad_nested = root("/a/");
        bad_nested.locations.push(root("/b/"));

        config.servers.push(server(vec![both, neither, bad_nested]));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::ZeroChunkSize));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ConflictingOrigin { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingOrigin { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NestedPrefix { .. })));
    }

    #[test]
    fn test_cache_needs_upstream() {
        let mut config = ProxyConfig::default();
        let mut loc = root("/v/");
        loc.cache = Some(true);
        config.servers.push(server(vec![loc]));

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::CacheWithoutUpstream { .. }));
    }

    #[test]
    fn test_duplicate_default_server() {
        let mut config = ProxyConfig::default();
        config.servers.push(server(vec![]));
        config.servers.push(server(vec![]));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateHost("<default>".into())]);
    }
}
