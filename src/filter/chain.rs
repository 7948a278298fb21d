//! Ordered response filter chain.
//!
//! # Design Decisions
//! - Stages are assembled once at startup into a plain `Vec`
//! - Head filters run once per request, before anything is sent
//! - Body filters run for every run of chunks, in body order
//! - A body stage returning `None` ends the invocation; later stages
//!   are not called with an empty run

use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::filter::chunk::ChunkRun;
use crate::filter::context::{RequestContext, ResponseHead};

/// Fatal filter failure; aborts the request.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("declared length overflow: {length} + {header} - {start}")]
    LengthOverflow { length: u64, header: u64, start: u64 },
}

/// A single stage of the response pipeline.
pub trait ResponseFilter: Send + Sync + fmt::Debug {
    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// Inspect or rewrite the response head.
    fn filter_head(
        &self,
        _ctx: &mut RequestContext,
        _head: &mut ResponseHead,
    ) -> Result<(), FilterError> {
        Ok(())
    }

    /// Transform one run of body chunks. `Ok(None)` forwards nothing.
    fn filter_body(
        &self,
        _ctx: &mut RequestContext,
        run: ChunkRun,
    ) -> Result<Option<ChunkRun>, FilterError> {
        Ok(Some(run))
    }
}

/// The assembled pipeline.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    stages: Vec<Arc<dyn ResponseFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage at the tail of the chain.
    pub fn with(mut self, stage: impl ResponseFilter + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn filter_head(
        &self,
        ctx: &mut RequestContext,
        head: &mut ResponseHead,
    ) -> Result<(), FilterError> {
        for stage in &self.stages {
            stage.filter_head(ctx, head)?;
        }
        Ok(())
    }

    pub fn filter_body(
        &self,
        ctx: &mut RequestContext,
        run: ChunkRun,
    ) -> Result<Option<ChunkRun>, FilterError> {
        let mut current = run;
        for stage in &self.stages {
            match stage.filter_body(ctx, current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

/// Lazily pulls runs from the origin and threads each one through the chain.
pub struct FilteredBody {
    source: BoxStream<'static, io::Result<ChunkRun>>,
    chain: Arc<FilterChain>,
    ctx: RequestContext,
    done: bool,
}

impl FilteredBody {
    pub fn new(
        source: BoxStream<'static, io::Result<ChunkRun>>,
        chain: Arc<FilterChain>,
        ctx: RequestContext,
    ) -> Self {
        Self {
            source,
            chain,
            ctx,
            done: false,
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }
}

impl Stream for FilteredBody {
    type Item = io::Result<ChunkRun>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            let run = match this.source.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(run))) => run,
            };

            match this.chain.filter_body(&mut this.ctx, run) {
                Ok(Some(out)) => return Poll::Ready(Some(Ok(out))),
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(
                        request_id = %this.ctx.request_id,
                        error = %e,
                        "Body filter failed, aborting response"
                    );
                    this.done = true;
                    return Poll::Ready(Some(Err(io::Error::other(e))));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::chunk::Chunk;
    use axum::http::{Method, StatusCode, Version};
    use bytes::Bytes;
    use futures_util::stream;

    #[derive(Debug)]
    struct DropAll;

    impl ResponseFilter for DropAll {
        fn name(&self) -> &'static str {
            "drop_all"
        }

        fn filter_body(
            &self,
            _ctx: &mut RequestContext,
            _run: ChunkRun,
        ) -> Result<Option<ChunkRun>, FilterError> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct SetStatus(StatusCode);

    impl ResponseFilter for SetStatus {
        fn name(&self) -> &'static str {
            "set_status"
        }

        fn filter_head(
            &self,
            _ctx: &mut RequestContext,
            head: &mut ResponseHead,
        ) -> Result<(), FilterError> {
            head.status = self.0;
            Ok(())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test", Method::GET, Version::HTTP_11)
    }

    #[test]
    fn test_head_stages_run_in_order() {
        let chain = FilterChain::new()
            .with(SetStatus(StatusCode::NOT_FOUND))
            .with(SetStatus(StatusCode::OK));
        let mut head = ResponseHead::new(StatusCode::PARTIAL_CONTENT);

        chain.filter_head(&mut ctx(), &mut head).unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(chain.stage_names(), vec!["set_status", "set_status"]);
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let chain = FilterChain::new();
        let run = vec![Chunk::Memory(Bytes::from_static(b"abc")), Chunk::Last];
        let out = chain.filter_body(&mut ctx(), run).unwrap().unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_filtered_body_skips_suppressed_runs() {
        let chain = Arc::new(FilterChain::new().with(DropAll));
        let source = stream::iter(vec![
            Ok::<_, io::Error>(vec![Chunk::Memory(Bytes::from_static(b"a"))]),
            Ok(vec![Chunk::Last]),
        ])
        .boxed();

        let body = FilteredBody::new(source, chain, ctx());
        let runs: Vec<_> = body.collect().await;
        assert!(runs.is_empty());
    }
}
