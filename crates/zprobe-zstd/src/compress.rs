//! Stream compression through the zstd codec
//!
//! The encoder writes through a [`CountingWriter`] that only borrows the
//! caller's sink, so finishing the frame never consumes or drops it. The sink
//! stays usable for whatever the caller appends next (e.g. further archive
//! entries).

use std::io::{self, Read, Write};

use zprobe_core::config::CompressConfig;
use zprobe_core::ZprobeResult;

#[cfg(not(feature = "zstd"))]
use zprobe_core::ZprobeError;

/// Writer adapter that counts bytes passed to a borrowed sink
#[derive(Debug)]
pub struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<'a, W: Write> CountingWriter<'a, W> {
    pub fn new(inner: &'a mut W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes accepted by the underlying sink so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compress everything from `input` into `output` at the default level.
///
/// Returns the compressed size, i.e. the number of bytes written to `output`.
pub fn compress_stream<R: Read, W: Write>(input: R, output: &mut W) -> ZprobeResult<u64> {
    compress_stream_with_options(input, output, &CompressConfig::default())
}

/// Like [`compress_stream`] with an explicit zstd level.
pub fn compress_stream_with_level<R: Read, W: Write>(
    input: R,
    output: &mut W,
    level: i32,
) -> ZprobeResult<u64> {
    let options = CompressConfig {
        level,
        ..CompressConfig::default()
    };
    compress_stream_with_options(input, output, &options)
}

/// Compress `input` into `output` using level and buffer size from `options`.
///
/// Errors from reading, from encoder construction, or from the sink are
/// returned as-is; whatever was already written to `output` stays there.
#[cfg(feature = "zstd")]
pub fn compress_stream_with_options<R: Read, W: Write>(
    mut input: R,
    output: &mut W,
    options: &CompressConfig,
) -> ZprobeResult<u64> {
    let mut counter = CountingWriter::new(output);

    let mut encoder = zstd::stream::write::Encoder::new(&mut counter, options.level)?;
    let read = copy_buffered(&mut input, &mut encoder, options.buffer_size)?;
    encoder.finish()?;
    counter.flush()?;

    let written = counter.bytes_written();
    tracing::debug!(read, written, level = options.level, "compressed stream");
    Ok(written)
}

#[cfg(not(feature = "zstd"))]
pub fn compress_stream_with_options<R: Read, W: Write>(
    _input: R,
    _output: &mut W,
    _options: &CompressConfig,
) -> ZprobeResult<u64> {
    Err(ZprobeError::CodecUnavailable(
        "built without the `zstd` feature".into(),
    ))
}

/// Copy `reader` into `writer` through a buffer of `buffer_size` bytes.
#[cfg(feature = "zstd")]
fn copy_buffered<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    Ok(total)
}
