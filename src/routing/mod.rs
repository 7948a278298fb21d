//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (server by host, then location by prefix)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Location or no match
//!
//! Route Compilation (at startup and on reload):
//!     ServerConfig[] with nested LocationConfig[]
//!     → Resolve inherited flv_filter and origin
//!     → Sort locations by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled ahead of time, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same location

pub mod matcher;
pub mod router;

pub use router::{Location, Router};
