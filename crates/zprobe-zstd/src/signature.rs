//! Zstandard frame signature detection
//!
//! A zstd stream starts either with a regular frame (magic `0xFD2FB528`,
//! little-endian on disk as `28 B5 2F FD`) or with one of sixteen skippable
//! frames (`0x184D2A50..=0x184D2A5F`, on disk `5? 2A 4D 18`). Only the fixed
//! 4-byte prefix is inspected; frame contents are never parsed.

use std::io::{self, Read};
use std::path::Path;

/// Zstandard frame magic bytes
pub const ZSTD_FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// The three bytes shared by every skippable frame magic
pub const SKIPPABLE_FRAME_MAGIC: [u8; 3] = [0x2A, 0x4D, 0x18];

/// High nibble of byte 0 that marks the skippable frame family
const SKIPPABLE_NIBBLE: u8 = 0x50;

/// Bytes needed before any decision can be made
pub const SIGNATURE_LEN: usize = ZSTD_FRAME_MAGIC.len();

/// Kind of zstd frame found at the start of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Regular compressed frame
    Frame,
    /// Skippable frame; `variant` is the low nibble of byte 0 (0..=15)
    Skippable { variant: u8 },
}

/// Classify the first bytes of `buf`.
///
/// Returns `None` when fewer than 4 bytes are available or when neither
/// signature matches.
pub fn classify(buf: &[u8]) -> Option<FrameKind> {
    if buf.len() < SIGNATURE_LEN {
        return None;
    }

    if buf[..SIGNATURE_LEN] == ZSTD_FRAME_MAGIC {
        return Some(FrameKind::Frame);
    }

    if buf[0] & 0xF0 == SKIPPABLE_NIBBLE && buf[1..SIGNATURE_LEN] == SKIPPABLE_FRAME_MAGIC {
        return Some(FrameKind::Skippable {
            variant: buf[0] & 0x0F,
        });
    }

    None
}

/// Check whether the first `length` bytes of `signature` look like zstd data.
///
/// `length` is the number of valid bytes in the buffer and may be smaller than
/// its capacity. A `length` past the end of the slice is clamped to the slice.
pub fn matches(signature: &[u8], length: usize) -> bool {
    let valid = &signature[..length.min(signature.len())];
    classify(valid).is_some()
}

/// Read up to 4 bytes from `reader` and classify them.
///
/// Short streams yield `Ok(None)`. The reader is left positioned after the
/// bytes consumed.
pub fn sniff<R: Read>(mut reader: R) -> io::Result<Option<FrameKind>> {
    let mut buf = [0u8; SIGNATURE_LEN];
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let kind = classify(&buf[..filled]);
    tracing::trace!(bytes = filled, ?kind, "sniffed zstd signature");
    Ok(kind)
}

/// Open the file at `path` and classify its first bytes.
pub fn sniff_path(path: &Path) -> io::Result<Option<FrameKind>> {
    let file = std::fs::File::open(path)?;
    sniff(file)
}
