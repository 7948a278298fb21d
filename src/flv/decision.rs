//! Decides, once per request, whether and where the body should start.
//!
//! # Design Decisions
//! - Preconditions are checked before the query string is touched
//! - Anything malformed or out of range is a silent decline, never an error
//! - The only fatal outcome is an unrepresentable rewritten length

use axum::http::{StatusCode, Version};

use crate::filter::context::CacheStatus;
use crate::flv::header::FLV_HEADER_LEN;
use crate::flv::mode::FilterMode;

/// Name of the query argument carrying the seek offset.
pub const START_ARG: &str = "start";

/// Inputs the decision needs from the request and response head.
#[derive(Debug, Clone, Copy)]
pub struct SeekRequest<'a> {
    pub mode: FilterMode,
    pub cache_status: Option<CacheStatus>,
    pub version: Version,
    pub status: StatusCode,
    pub is_main: bool,
    pub content_length: Option<u64>,
    pub query: Option<&'a str>,
}

/// Why a request was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    ModeOff,
    NotCached,
    HttpVersion,
    Status,
    Subrequest,
    UnknownLength,
    NoQuery,
    NoStartArg,
    InvalidStart,
    OutOfRange,
}

impl DeclineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineReason::ModeOff => "mode_off",
            DeclineReason::NotCached => "not_cached",
            DeclineReason::HttpVersion => "http_version",
            DeclineReason::Status => "status",
            DeclineReason::Subrequest => "subrequest",
            DeclineReason::UnknownLength => "unknown_length",
            DeclineReason::NoQuery => "no_query",
            DeclineReason::NoStartArg => "no_start_arg",
            DeclineReason::InvalidStart => "invalid_start",
            DeclineReason::OutOfRange => "out_of_range",
        }
    }
}

/// Outcome of the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDecision {
    /// Rewrite the body to begin at this original byte offset.
    Accept(u64),
    /// Forward the response unmodified.
    Decline(DeclineReason),
}

impl SeekDecision {
    pub fn outcome(&self) -> &'static str {
        match self {
            SeekDecision::Accept(_) => "accept",
            SeekDecision::Decline(reason) => reason.as_str(),
        }
    }
}

/// Run the decision for one response.
pub fn decide(req: &SeekRequest<'_>) -> SeekDecision {
    match req.mode {
        FilterMode::On => {}
        FilterMode::Cached if req.cache_status == Some(CacheStatus::Hit) => {}
        FilterMode::Cached => return SeekDecision::Decline(DeclineReason::NotCached),
        FilterMode::Off => return SeekDecision::Decline(DeclineReason::ModeOff),
    }

    if req.version < Version::HTTP_10 {
        return SeekDecision::Decline(DeclineReason::HttpVersion);
    }
    if req.status != StatusCode::OK {
        return SeekDecision::Decline(DeclineReason::Status);
    }
    if !req.is_main {
        return SeekDecision::Decline(DeclineReason::Subrequest);
    }
    let Some(content_length) = req.content_length else {
        return SeekDecision::Decline(DeclineReason::UnknownLength);
    };

    let query = match req.query {
        Some(q) if !q.is_empty() => q,
        _ => return SeekDecision::Decline(DeclineReason::NoQuery),
    };

    let Some(raw) = crate::http::request::query_arg(query, START_ARG) else {
        return SeekDecision::Decline(DeclineReason::NoStartArg);
    };

    let Some(start) = parse_offset(raw) else {
        return SeekDecision::Decline(DeclineReason::InvalidStart);
    };

    if start == 0 || start >= content_length {
        return SeekDecision::Decline(DeclineReason::OutOfRange);
    }

    SeekDecision::Accept(start)
}

/// Parse an unsigned decimal offset. Signs, whitespace, empty input and
/// values past `i64::MAX` are rejected.
pub fn parse_offset(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    raw.parse::<u64>()
        .ok()
        .filter(|v| *v <= i64::MAX as u64)
}

/// Declared length of the rewritten body: the leading `start` bytes are
/// replaced by the synthetic header.
pub fn rewritten_length(content_length: u64, start: u64) -> Option<u64> {
    content_length
        .checked_add(FLV_HEADER_LEN)?
        .checked_sub(start)
}
