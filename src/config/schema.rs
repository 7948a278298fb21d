//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.
//!
//! `flv_filter` may be set at the top level, per server and per location;
//! the nearest explicit setting applies and an unset chain means `off`.

use serde::{Deserialize, Serialize};

use crate::flv::FilterMode;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Filter mode inherited by every server.
    pub flv_filter: Option<FilterMode>,

    /// Virtual servers, matched by `Host`.
    pub servers: Vec<ServerConfig>,

    /// Static file serving settings.
    pub static_files: StaticFilesConfig,

    /// Upstream response cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A virtual server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server identifier for logging/metrics.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Host header to match (exact, case-insensitive). `None` = default server.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub flv_filter: Option<FilterMode>,

    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

fn default_server_name() -> String {
    "default".to_string()
}

/// A path-prefix scope inside a server. Locations may nest; a nested
/// prefix must extend its parent's.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Path prefix to match.
    pub path_prefix: String,

    #[serde(default)]
    pub flv_filter: Option<FilterMode>,

    /// Serve files from this directory.
    #[serde(default)]
    pub root: Option<String>,

    /// Proxy to this upstream (`host:port`).
    #[serde(default)]
    pub upstream: Option<String>,

    /// Cache upstream responses.
    #[serde(default)]
    pub cache: Option<bool>,

    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

impl LocationConfig {
    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            flv_filter: None,
            root: None,
            upstream: None,
            cache: None,
            locations: Vec::new(),
        }
    }
}

/// Static file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Size of each file-backed body unit, in bytes.
    pub read_chunk_size: u64,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 512 * 1024,
        }
    }
}

/// Upstream cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Largest response body that will be stored.
    pub max_entry_bytes: u64,

    /// Maximum number of stored responses.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_entry_bytes: 64 * 1024 * 1024,
            max_entries: 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for an upstream to return its response head, in seconds.
    pub upstream_secs: u64,

    /// Time allowed to produce a response head for the client, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
