//! HTTP file server and reverse proxy with FLV pseudo-streaming.
//!
//! A request for `clip.flv?start=N` on a location with the seek filter
//! enabled is answered with a fresh FLV header followed by the original
//! body from byte `N`, so players can jump to any keyframe offset.

pub mod config;
pub mod filter;
pub mod flv;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod origin;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
