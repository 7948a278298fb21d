//! The seek stage as a member of the response filter chain.

use axum::http::{header, StatusCode};

use crate::filter::chain::{FilterError, ResponseFilter};
use crate::filter::chunk::ChunkRun;
use crate::filter::context::{RequestContext, ResponseHead};
use crate::flv::decision::{decide, rewritten_length, SeekDecision, SeekRequest};
use crate::flv::header::FLV_HEADER_LEN;
use crate::flv::rewrite::rewrite_run;
use crate::flv::state::SeekState;
use crate::flv::FilterMode;
use crate::observability::metrics;

/// Serves `?start=N` requests as if the resource began at byte `N`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlvSeekFilter;

impl FlvSeekFilter {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseFilter for FlvSeekFilter {
    fn name(&self) -> &'static str {
        "flv_seek"
    }

    fn filter_head(
        &self,
        ctx: &mut RequestContext,
        head: &mut ResponseHead,
    ) -> Result<(), FilterError> {
        tracing::debug!(
            request_id = %ctx.request_id,
            mode = %ctx.filter_mode,
            "flv filter header stage"
        );

        let decision = decide(&SeekRequest {
            mode: ctx.filter_mode,
            cache_status: ctx.cache_status,
            version: ctx.version,
            status: head.status,
            is_main: ctx.is_main,
            content_length: head.content_length,
            query: ctx.query.as_deref(),
        });

        if ctx.filter_mode != FilterMode::Off {
            metrics::record_seek_decision(decision.outcome());
        }

        let start = match decision {
            SeekDecision::Accept(start) => start,
            SeekDecision::Decline(reason) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    reason = reason.as_str(),
                    "flv seek declined"
                );
                return Ok(());
            }
        };

        // decide() only accepts with a known length
        let length = head.content_length.unwrap_or_default();
        let new_length = rewritten_length(length, start).ok_or(FilterError::LengthOverflow {
            length,
            header: FLV_HEADER_LEN,
            start,
        })?;

        head.status = StatusCode::OK;
        head.content_length = Some(new_length);
        head.headers.remove(header::CONTENT_LENGTH);
        ctx.flv_seek = Some(SeekState::new(start));

        tracing::debug!(
            request_id = %ctx.request_id,
            start,
            original_length = length,
            content_length = new_length,
            "flv seek accepted"
        );

        Ok(())
    }

    fn filter_body(
        &self,
        ctx: &mut RequestContext,
        run: ChunkRun,
    ) -> Result<Option<ChunkRun>, FilterError> {
        if run.is_empty() || ctx.filter_mode == FilterMode::Off {
            return Ok(Some(run));
        }

        let Some(state) = ctx.flv_seek.as_mut() else {
            return Ok(Some(run));
        };

        let output = rewrite_run(state, run);

        if output.skipped > 0 {
            tracing::trace!(
                request_id = %ctx.request_id,
                skipped = output.skipped,
                offset = state.offset(),
                "flv body skip"
            );
            metrics::record_seek_bytes_skipped(output.skipped);
        }

        Ok(output.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::chunk::{run_len, Chunk};
    use crate::filter::context::CacheStatus;
    use axum::http::{HeaderMap, HeaderValue, Method, Version};
    use bytes::Bytes;

    fn ctx(mode: FilterMode, query: Option<&str>) -> RequestContext {
        RequestContext::new("test", Method::GET, Version::HTTP_11)
            .with_filter_mode(mode)
            .with_query(query)
    }

    fn head(len: u64) -> ResponseHead {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/x-flv"));
        ResponseHead::from_parts(StatusCode::OK, headers)
    }

    #[test]
    fn test_accept_rewrites_head() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::On, Some("start=500"));
        let mut head = head(1000);

        filter.filter_head(&mut ctx, &mut head).unwrap();

        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.content_length, Some(513));
        assert!(head.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(head.headers.get(header::CONTENT_TYPE).is_some());
        assert_eq!(ctx.flv_seek.map(|s| s.start()), Some(500));
    }

    #[test]
    fn test_decline_leaves_head_alone() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::On, Some("start=2000"));
        let mut head = head(1000);

        filter.filter_head(&mut ctx, &mut head).unwrap();

        assert_eq!(head.content_length, Some(1000));
        assert_eq!(head.headers.get(header::CONTENT_LENGTH).unwrap(), "1000");
        assert!(ctx.flv_seek.is_none());
    }

    #[test]
    fn test_cached_mode_without_hit() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::Cached, Some("start=500"))
            .with_cache_status(Some(CacheStatus::Miss));
        let mut head = head(1000);

        filter.filter_head(&mut ctx, &mut head).unwrap();
        assert!(ctx.flv_seek.is_none());
        assert_eq!(head.content_length, Some(1000));
    }

    #[test]
    fn test_mode_off_is_identity() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::Off, Some("start=500"));
        let mut head = head(1000);

        filter.filter_head(&mut ctx, &mut head).unwrap();
        assert!(ctx.flv_seek.is_none());

        let run = vec![Chunk::Memory(Bytes::from(vec![7u8; 1000])), Chunk::Last];
        let out = filter.filter_body(&mut ctx, run).unwrap().unwrap();
        assert_eq!(run_len(&out), 1000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_length_overflow_is_fatal() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::On, Some("start=1"));
        let mut head = ResponseHead::new(StatusCode::OK).with_content_length(u64::MAX);

        let err = filter.filter_head(&mut ctx, &mut head).unwrap_err();
        assert!(matches!(err, FilterError::LengthOverflow { .. }));
        assert!(ctx.flv_seek.is_none());
    }

    #[test]
    fn test_body_total_matches_declared_length() {
        let filter = FlvSeekFilter::new();
        let mut ctx = ctx(FilterMode::On, Some("start=500"));
        let mut head = head(1000);
        filter.filter_head(&mut ctx, &mut head).unwrap();

        let mut total = 0;
        for run in [
            vec![Chunk::Memory(Bytes::from(vec![1u8; 300]))],
            vec![Chunk::Memory(Bytes::from(vec![2u8; 700]))],
            vec![Chunk::Last],
        ] {
            if let Some(out) = filter.filter_body(&mut ctx, run).unwrap() {
                total += run_len(&out);
            }
        }

        assert_eq!(Some(total), head.content_length);
    }
}
