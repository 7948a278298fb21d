//! Per-request state shared by all filter stages.

use axum::http::{header, HeaderMap, Method, StatusCode, Version};

use crate::flv::{FilterMode, SeekState};

/// Where the response body came from, relative to the upstream cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a stored copy.
    Hit,
    /// Fetched from upstream (and possibly stored).
    Miss,
    /// Fetched from upstream, not eligible for caching.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Everything the filter chain knows about one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub version: Version,
    /// False for internally generated subrequests.
    pub is_main: bool,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Effective mode of the matched location.
    pub filter_mode: FilterMode,
    /// Set when the body came through the upstream cache layer.
    pub cache_status: Option<CacheStatus>,
    /// Present once the seek filter accepted this request.
    pub flv_seek: Option<SeekState>,
    /// Payload bytes handed to the client so far.
    pub bytes_sent: u64,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, method: Method, version: Version) -> Self {
        Self {
            request_id: request_id.into(),
            method,
            version,
            is_main: true,
            query: None,
            filter_mode: FilterMode::Off,
            cache_status: None,
            flv_seek: None,
            bytes_sent: 0,
        }
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(str::to_owned);
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_cache_status(mut self, status: Option<CacheStatus>) -> Self {
        self.cache_status = status;
        self
    }

    pub fn is_cache_hit(&self) -> bool {
        self.cache_status == Some(CacheStatus::Hit)
    }
}

/// Response status line and headers before they are sent.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Declared body length; `None` when unknown.
    pub content_length: Option<u64>,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_length: None,
        }
    }

    /// Build from an existing header map, taking the declared length from
    /// its `Content-Length` field.
    pub fn from_parts(status: StatusCode, headers: HeaderMap) -> Self {
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            status,
            headers,
            content_length,
        }
    }

    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }
}
