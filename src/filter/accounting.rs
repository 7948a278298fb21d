//! Byte accounting at the tail of the chain.

use crate::filter::chain::{FilterError, ResponseFilter};
use crate::filter::chunk::{run_len, ChunkRun};
use crate::filter::context::RequestContext;
use crate::observability::metrics;

/// Counts payload bytes that actually leave the pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountingFilter;

impl ResponseFilter for AccountingFilter {
    fn name(&self) -> &'static str {
        "accounting"
    }

    fn filter_body(
        &self,
        ctx: &mut RequestContext,
        run: ChunkRun,
    ) -> Result<Option<ChunkRun>, FilterError> {
        let len = run_len(&run);
        ctx.bytes_sent += len;
        metrics::record_body_bytes(len);

        if run.iter().any(|c| c.is_last()) {
            tracing::debug!(
                request_id = %ctx.request_id,
                bytes_sent = ctx.bytes_sent,
                "Response body complete"
            );
        }

        Ok(Some(run))
    }
}
