//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, location lookup)
//!     → origin (static file or upstream, maybe cached)
//!     → filter chain (head, then every body run)
//!     → response.rs (declared length, body frames)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{query_arg, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
