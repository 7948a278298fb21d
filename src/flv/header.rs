//! Synthetic FLV file header.

use bytes::Bytes;

/// Minimal FLV preamble: signature, version 1, audio+video flags,
/// header size 9, then a zero `PreviousTagSize0`.
pub static FLV_HEADER: [u8; FLV_HEADER_LEN as usize] =
    *b"FLV\x01\x05\x00\x00\x00\x09\x00\x00\x00\x00";

/// Length of [`FLV_HEADER`] in bytes.
pub const FLV_HEADER_LEN: u64 = 13;

/// The header as a zero-copy buffer over the static bytes.
pub fn header_bytes() -> Bytes {
    Bytes::from_static(&FLV_HEADER)
}
