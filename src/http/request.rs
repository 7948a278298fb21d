//! Request identification and query-string helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Expose the ID to handlers for structured logging
//! - Extract named query arguments without decoding them
//!
//! # Design Decisions
//! - Argument names match case-insensitively, values are returned raw
//! - The first occurrence of an argument wins

use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Value of the first `name=value` pair in a raw query string.
///
/// Returns `None` when the argument is missing or has no `=`.
pub fn query_arg<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let bytes = pair.as_bytes();
        if bytes.len() <= name.len() || bytes[name.len()] != b'=' {
            return None;
        }
        if !bytes[..name.len()].eq_ignore_ascii_case(name.as_bytes()) {
            return None;
        }
        Some(&pair[name.len() + 1..])
    })
}
