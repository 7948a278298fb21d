//! FLV pseudo-streaming.
//!
//! # Data Flow
//! ```text
//! Response head ready
//!     → decision.rs (mode, preconditions, ?start=N)
//!     → Accept: status 200, length L + 13 - N, SeekState stored on the request
//!     → Decline: nothing changes
//!
//! Every body run afterwards
//!     → rewrite.rs (header once, elide / trim / pass each unit)
//!     → next filter stage
//! ```
//!
//! # Design Decisions
//! - The injected header is a fixed 13-byte preamble; no tag boundary search
//! - Invalid seek requests fall back to the plain response, never an error
//! - File-backed units are repositioned, never read

pub mod decision;
pub mod filter;
pub mod header;
pub mod mode;
pub mod rewrite;
pub mod state;

pub use decision::{decide, DeclineReason, SeekDecision, SeekRequest};
pub use filter::FlvSeekFilter;
pub use header::{FLV_HEADER, FLV_HEADER_LEN};
pub use mode::FilterMode;
pub use rewrite::rewrite_run;
pub use state::SeekState;
