//! zprobe-zstd: Zstandard availability probing, frame signature detection, and stream compression
//!
//! # Overview
//! - `signature`: frame / skippable-frame magic matching for format auto-detection
//! - `availability`: cached or uncached "is the zstd codec usable" checks
//! - `compress`: stream bytes through a zstd encoder without consuming the caller's sink

pub mod availability;
pub mod compress;
pub mod signature;

// Convenience re-exports for the most common operations
pub use availability::{
    global, init_global, is_zstd_compression_available, set_cache_zstd_availability,
    AvailabilityCache, CachedAvailability, CodecProbe, HostEnvironment, LinkedZstdProbe,
    ZstdSupport,
};
pub use compress::{
    compress_stream, compress_stream_with_level, compress_stream_with_options, CountingWriter,
};
pub use signature::{classify, matches, sniff, sniff_path, FrameKind};
