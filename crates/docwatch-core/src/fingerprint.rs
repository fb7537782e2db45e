//! Content fingerprints.
//!
//! A document's checksum is the IEEE CRC-32 of the UTF-8 bytes of its
//! extracted text. It depends on content only, so two scans of the same
//! bytes always agree regardless of walk order or file timestamps.

/// Compute the checksum of a document's full text.
pub fn checksum(text: &str) -> u32 {
    crc32fast::hash(text.as_bytes())
}
