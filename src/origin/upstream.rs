//! Upstream HTTP origin.
//!
//! # Responsibilities
//! - Forward the client request to the location's upstream
//! - Strip hop-by-hop headers in both directions
//! - Deliver the upstream body as in-memory units
//! - Serve and fill the response cache for caching locations

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::io;
use std::str::FromStr;
use std::time::Duration;

use crate::filter::{CacheStatus, Chunk, ResponseHead};
use crate::origin::cache::{CachedResponse, ResponseCache};
use crate::origin::{BodySource, OriginError, OriginResponse};

/// Header reporting how the cache handled the request.
pub const X_CACHE_STATUS: &str = "x-cache-status";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Shared client for all upstream locations.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    /// Proxy `request` to `upstream`, consulting `cache` when given.
    pub async fn fetch(
        &self,
        upstream: &str,
        request: Request<Body>,
        cache: Option<&ResponseCache>,
    ) -> Result<OriginResponse, OriginError> {
        let path_and_query = request
            .uri()
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let key = format!("{}{}", upstream, path_and_query);
        let method = request.method().clone();
        let cacheable_method = method == Method::GET || method == Method::HEAD;

        let cache = cache.filter(|_| cacheable_method);

        if let Some(cache) = cache {
            if let Some(hit) = cache.get(&key) {
                tracing::debug!(key = %key, "Upstream cache hit");
                return Ok(from_cache(&hit));
            }
        }

        let (status, headers, body) = self.send(upstream, path_and_query, request).await?;
        let mut head = ResponseHead::from_parts(status, headers);

        let Some(cache) = cache else {
            return Ok(OriginResponse {
                head,
                body: streaming_body(body),
                cache_status: None,
            });
        };

        let storable =
            method == Method::GET && status == StatusCode::OK && cache.accepts(head.content_length);

        if !storable {
            set_cache_header(&mut head.headers, CacheStatus::Bypass);
            return Ok(OriginResponse {
                head,
                body: streaming_body(body),
                cache_status: Some(CacheStatus::Bypass),
            });
        }

        let limit = usize::try_from(cache.max_entry_bytes()).unwrap_or(usize::MAX);
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| OriginError::Upstream(e.to_string()))?;

        cache.insert(key, CachedResponse::new(status, head.headers.clone(), bytes.clone()));

        set_cache_header(&mut head.headers, CacheStatus::Miss);
        Ok(OriginResponse {
            head,
            body: memory_body(bytes),
            cache_status: Some(CacheStatus::Miss),
        })
    }

    async fn send(
        &self,
        upstream: &str,
        path_and_query: PathAndQuery,
        request: Request<Body>,
    ) -> Result<(StatusCode, HeaderMap, Body), OriginError> {
        let authority =
            Authority::from_str(upstream).map_err(|e| OriginError::Upstream(e.to_string()))?;

        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| OriginError::Upstream(e.to_string()))?;

        let (parts, body) = request.into_parts();
        let mut builder = Request::builder().method(parts.method).uri(uri);

        if let Some(headers) = builder.headers_mut() {
            for (k, v) in parts.headers.iter() {
                if k != header::HOST && !is_hop_by_hop(k) {
                    headers.append(k.clone(), v.clone());
                }
            }
            if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
                headers.insert(header::HOST, host);
            }
        }

        let req = builder
            .body(body)
            .map_err(|e| OriginError::Upstream(e.to_string()))?;

        let response = match tokio::time::timeout(self.timeout, self.client.request(req)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(upstream = %upstream, error = %e, "Upstream error");
                return Err(OriginError::Upstream(e.to_string()));
            }
            Err(_) => {
                tracing::error!(upstream = %upstream, "Upstream timed out");
                return Err(OriginError::UpstreamTimeout);
            }
        };

        let (parts, body): (_, Incoming) = response.into_parts();
        let mut headers = parts.headers;
        for name in HOP_BY_HOP {
            headers.remove(name);
        }

        Ok((parts.status, headers, Body::new(body)))
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn set_cache_header(headers: &mut HeaderMap, status: CacheStatus) {
    headers.insert(
        HeaderName::from_static(X_CACHE_STATUS),
        HeaderValue::from_static(status.as_str()),
    );
}

fn from_cache(cached: &CachedResponse) -> OriginResponse {
    let mut headers = cached.headers.clone();
    set_cache_header(&mut headers, CacheStatus::Hit);

    OriginResponse {
        head: ResponseHead::from_parts(cached.status, headers),
        body: memory_body(cached.body.clone()),
        cache_status: Some(CacheStatus::Hit),
    }
}

/// The whole body as one in-memory unit plus the end marker.
pub fn memory_body(bytes: Bytes) -> BodySource {
    stream::once(async move { Ok::<_, io::Error>(vec![Chunk::Memory(bytes), Chunk::Last]) }).boxed()
}

/// Each upstream data frame becomes one run; the end marker follows.
fn streaming_body(body: Body) -> BodySource {
    body.into_data_stream()
        .map_ok(|bytes| vec![Chunk::Memory(bytes)])
        .map_err(io::Error::other)
        .chain(stream::once(async { Ok::<_, io::Error>(vec![Chunk::Last]) }))
        .boxed()
}
