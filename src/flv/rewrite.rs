//! Rewrites the body so it begins at the seek offset.
//!
//! Each invocation takes the next run of original body units and returns
//! the run to forward: the synthetic header once at the very beginning,
//! then every unit elided, front-trimmed or passed through depending on
//! where it lies relative to `start`. Markers keep their position.

use crate::filter::chunk::{Chunk, ChunkRun};
use crate::flv::header::header_bytes;
use crate::flv::state::SeekState;

/// Result of one rewrite invocation, with bookkeeping for logs and metrics.
#[derive(Debug)]
pub struct RewriteOutput {
    /// Run to forward, `None` when nothing is left to send.
    pub run: Option<ChunkRun>,
    /// Original bytes dropped from this run.
    pub skipped: u64,
    pub header_emitted: bool,
}

/// Transform one input run.
pub fn rewrite_run(state: &mut SeekState, input: ChunkRun) -> RewriteOutput {
    if input.is_empty() {
        return RewriteOutput {
            run: Some(input),
            skipped: 0,
            header_emitted: false,
        };
    }

    let mut out = Vec::with_capacity(input.len() + 1);
    let mut skipped = 0;
    let mut header_emitted = false;

    if state.needs_header() {
        out.push(Chunk::Memory(header_bytes()));
        state.mark_header_sent();
        header_emitted = true;
    }

    let start = state.start();

    for mut chunk in input {
        let (unit_start, unit_end) = state.consume(chunk.len());

        tracing::trace!(unit_start, unit_end, "flv body unit");

        if chunk.is_marker() {
            out.push(chunk);
            continue;
        }

        if start >= unit_end {
            skipped += chunk.len();
            chunk.skip_all();
            continue;
        }

        if start > unit_start {
            let trim = start - unit_start;
            skipped += trim;
            chunk.advance(trim);
        }

        out.push(chunk);
    }

    RewriteOutput {
        run: if out.is_empty() { None } else { Some(out) },
        skipped,
        header_emitted,
    }
}
