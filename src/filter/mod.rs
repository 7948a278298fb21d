//! Response filter subsystem.
//!
//! # Data Flow
//! ```text
//! Origin (static file / upstream / cache)
//!     → ResponseHead + stream of ChunkRun
//!     → chain.rs filter_head (every stage, in order)
//!     → FilteredBody: each pulled run → chain.rs filter_body
//!     → http::response (chunks materialised into byte frames)
//! ```
//!
//! # Design Decisions
//! - Per-request state lives in typed fields of `RequestContext`
//! - The chain is built once and shared via `Arc`
//! - Chunks carry cursors; only the final response stage reads files

pub mod accounting;
pub mod chain;
pub mod chunk;
pub mod context;

pub use accounting::AccountingFilter;
pub use chain::{FilterChain, FilterError, FilteredBody, ResponseFilter};
pub use chunk::{Chunk, ChunkRun, FileRegion};
pub use context::{CacheStatus, RequestContext, ResponseHead};

use crate::flv::FlvSeekFilter;

/// The production chain: seek rewriting, then byte accounting.
pub fn default_chain() -> FilterChain {
    FilterChain::new().with(FlvSeekFilter::new()).with(AccountingFilter)
}
