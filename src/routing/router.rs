//! Route lookup.
//!
//! # Responsibilities
//! - Compile servers and nested locations into flat, immutable tables
//! - Resolve inherited filter mode and origin per location
//! - Look up the location for a request, or report no match
//!
//! # Design Decisions
//! - Immutable after construction (swapped whole on reload)
//! - Server chosen by exact host, falling back to the default server
//! - Longest matching path prefix wins within a server
//! - Explicit `None` rather than a silent catch-all

use std::path::PathBuf;

use crate::config::{LocationConfig, ProxyConfig};
use crate::flv::FilterMode;
use crate::origin::OriginTarget;
use crate::routing::matcher::{HostMatcher, PathPrefixMatcher};

/// A compiled location with every inherited setting resolved.
#[derive(Debug, Clone)]
pub struct Location {
    pub server: String,
    pub matcher: PathPrefixMatcher,
    pub filter_mode: FilterMode,
    pub origin: OriginTarget,
}

impl Location {
    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }
}

#[derive(Debug, Clone)]
struct CompiledServer {
    name: String,
    host: Option<HostMatcher>,
    /// Sorted by descending prefix length.
    locations: Vec<Location>,
}

impl CompiledServer {
    fn lookup(&self, path: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.matcher.matches(path))
    }
}

/// The compiled routing table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    servers: Vec<CompiledServer>,
}

impl Router {
    /// Compile the routing table from a validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let servers = config
            .servers
            .iter()
            .map(|server| {
                let server_mode = FilterMode::inherit(server.flv_filter, config.flv_filter);
                let mut locations = Vec::new();
                for location in &server.locations {
                    compile_location(&server.name, location, server_mode, None, &mut locations);
                }
                locations.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));

                CompiledServer {
                    name: server.name.clone(),
                    host: server.host.as_deref().map(HostMatcher::new),
                    locations,
                }
            })
            .collect();

        Self { servers }
    }

    /// Find the location serving `path` on the server selected by `host`.
    pub fn match_request(&self, host: Option<&str>, path: &str) -> Option<&Location> {
        let by_host = host.and_then(|h| {
            self.servers
                .iter()
                .find(|s| s.host.as_ref().is_some_and(|m| m.matches(h)))
        });
        let server = by_host.or_else(|| self.default_server())?;

        server.lookup(path)
    }

    /// The first server without a host, or the first server at all.
    fn default_server(&self) -> Option<&CompiledServer> {
        self.servers
            .iter()
            .find(|s| s.host.is_none())
            .or_else(|| self.servers.first())
    }

    pub fn location_count(&self) -> usize {
        self.servers.iter().map(|s| s.locations.len()).sum()
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }
}

fn compile_location(
    server: &str,
    location: &LocationConfig,
    parent_mode: Option<FilterMode>,
    parent_origin: Option<&OriginTarget>,
    out: &mut Vec<Location>,
) {
    let merged_mode = FilterMode::inherit(location.flv_filter, parent_mode);

    let own_origin = match (&location.root, &location.upstream) {
        (Some(root), _) => Some(OriginTarget::Root(PathBuf::from(root))),
        (None, Some(upstream)) => Some(OriginTarget::Upstream {
            address: upstream.clone(),
            cache: location.cache.unwrap_or(false),
        }),
        (None, None) => parent_origin.map(|origin| match origin {
            // A nested location may switch caching on or off for the
            // upstream it inherits.
            OriginTarget::Upstream { address, cache } => OriginTarget::Upstream {
                address: address.clone(),
                cache: location.cache.unwrap_or(*cache),
            },
            other => other.clone(),
        }),
    };

    let Some(origin) = own_origin else {
        tracing::warn!(
            server = %server,
            prefix = %location.path_prefix,
            "Location has no origin, skipping"
        );
        return;
    };

    for child in &location.locations {
        compile_location(server, child, merged_mode, Some(&origin), out);
    }

    out.push(Location {
        server: server.to_string(),
        matcher: PathPrefixMatcher::new(location.path_prefix.clone()),
        filter_mode: FilterMode::resolve(merged_mode),
        origin,
    });
}
