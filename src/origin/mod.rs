//! Origin subsystem: where original response bodies come from.
//!
//! # Data Flow
//! ```text
//! Matched location
//!     → static_files.rs (root directory, file-backed units)
//!     → upstream.rs (proxied request, in-memory units)
//!         → cache.rs (HIT / MISS / BYPASS)
//!     → OriginResponse { head, body runs, cache status }
//! ```

pub mod cache;
pub mod static_files;
pub mod upstream;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::stream::BoxStream;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::filter::{CacheStatus, ChunkRun, ResponseHead};

pub use cache::ResponseCache;
pub use static_files::StaticFiles;
pub use upstream::UpstreamClient;

/// Lazy, ordered body runs ending with a run that holds `Chunk::Last`.
pub type BodySource = BoxStream<'static, io::Result<ChunkRun>>;

/// Failure to produce a response from the origin.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("upstream timed out")]
    UpstreamTimeout,
}

impl OriginError {
    pub fn status(&self) -> StatusCode {
        match self {
            OriginError::NotFound => StatusCode::NOT_FOUND,
            OriginError::Forbidden => StatusCode::FORBIDDEN,
            OriginError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            OriginError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OriginError::Upstream(_) => StatusCode::BAD_GATEWAY,
            OriginError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Head and lazily produced body of an origin response.
pub struct OriginResponse {
    pub head: ResponseHead,
    pub body: BodySource,
    pub cache_status: Option<CacheStatus>,
}

/// Where a location gets its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginTarget {
    /// Files below a root directory.
    Root(PathBuf),
    /// An HTTP upstream (`host:port`), optionally cached.
    Upstream { address: String, cache: bool },
}

impl OriginTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            OriginTarget::Root(_) => "static",
            OriginTarget::Upstream { .. } => "upstream",
        }
    }
}

/// Shared origin machinery used by every request.
#[derive(Clone)]
pub struct Origins {
    client: UpstreamClient,
    cache: ResponseCache,
    read_chunk_size: u64,
}

impl Origins {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            client: UpstreamClient::new(
                Duration::from_secs(config.timeouts.connect_secs),
                Duration::from_secs(config.timeouts.upstream_secs),
            ),
            cache: ResponseCache::new(&config.cache),
            read_chunk_size: config.static_files.read_chunk_size,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Produce the original response for `request` from `target`.
    pub async fn fetch(
        &self,
        target: &OriginTarget,
        request: Request<Body>,
    ) -> Result<OriginResponse, OriginError> {
        match target {
            OriginTarget::Root(root) => {
                // The request body is not Sync; only owned parts cross the await.
                let method = request.method().clone();
                let path = request.uri().path().to_owned();
                StaticFiles::new(root.clone(), self.read_chunk_size)
                    .serve(&method, &path)
                    .await
            }
            OriginTarget::Upstream { address, cache } => {
                let cache = if *cache { Some(&self.cache) } else { None };
                self.client.fetch(address, request, cache).await
            }
        }
    }
}
