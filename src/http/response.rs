//! Response assembly.
//!
//! # Responsibilities
//! - Turn a filtered `ResponseHead` into the outgoing status and headers
//! - Materialize body runs into byte frames for the client
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - File-backed units are read only here, after every filter has run
//! - The declared length always wins over any origin `Content-Length`

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::filter::{FilteredBody, ResponseHead};

/// Read buffer used when streaming file-backed units.
pub const FILE_READ_BUFFER: usize = 64 * 1024;

/// Frames every chunk of every run, in order.
pub fn into_body(body: FilteredBody, file_buf_size: usize) -> Body {
    let frames = body
        .map_ok(move |run| {
            stream::iter(run)
                .map(move |chunk| chunk.into_stream(file_buf_size))
                .flatten()
        })
        .try_flatten();

    Body::from_stream(frames)
}

/// Final response from a filtered head and a ready body.
pub fn build_response(head: ResponseHead, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;

    if let Some(len) = head.content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    response
}

/// Plain-text error response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::chunk::tests::temp_file;
    use crate::filter::{Chunk, FileRegion, FilterChain, RequestContext};
    use axum::http::{Method, Version};
    use bytes::Bytes;
    use std::io;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_body_materializes_memory_and_file_units() {
        let file = temp_file(b"0123456789");
        let runs = vec![
            Ok::<_, io::Error>(vec![Chunk::Memory(Bytes::from_static(b"ab")), Chunk::Flush]),
            Ok(vec![Chunk::File(FileRegion::new(file, 3, 7)), Chunk::Last]),
        ];
        let ctx = RequestContext::new("t", Method::GET, Version::HTTP_11);
        let filtered = FilteredBody::new(
            stream::iter(runs).boxed(),
            Arc::new(FilterChain::new()),
            ctx,
        );

        let body = into_body(filtered, 4);
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ab3456");
    }

    #[test]
    fn test_declared_length_replaces_origin_header() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("1000"));
        let head = head.with_content_length(513);

        let response = build_response(head, Body::empty());
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "513");
    }
}
