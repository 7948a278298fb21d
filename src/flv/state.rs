//! Per-request seek state.

/// Tracks where output should begin and how much of the original body has
/// been seen. Created only when a request is accepted for rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekState {
    start: u64,
    offset: u64,
    header_sent: bool,
}

impl SeekState {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            offset: 0,
            header_sent: false,
        }
    }

    /// Byte offset into the original body where output begins.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Original body bytes observed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    /// True when the synthetic header still has to go out.
    pub(crate) fn needs_header(&self) -> bool {
        !self.header_sent && self.offset == 0 && self.start > 0
    }

    pub(crate) fn mark_header_sent(&mut self) {
        self.header_sent = true;
    }

    /// Account for a unit of `len` bytes, returning its `[start, end)` span
    /// in the original body.
    pub(crate) fn consume(&mut self, len: u64) -> (u64, u64) {
        let unit_start = self.offset;
        self.offset = self.offset.saturating_add(len);
        (unit_start, self.offset)
    }
}
