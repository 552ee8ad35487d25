//! Reusable deflate state shared across concurrent requests.
//!
//! Allocating a deflate window per response is the expensive part of
//! compressing it. The pool keeps finished compressors per [`Encoding`] and
//! hands them out behind a [`PooledCompressor`] guard. The guard returns the
//! compressor on drop, so it goes back exactly once on every exit path:
//! normal return, early return, or a panic unwinding through the plugin.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::{Compress, Compression, Crc, FlushCompress, Status};
use parking_lot::Mutex;
use tracing::trace;

use super::compression::Encoding;
use crate::error::Error;

/// Output reserved ahead of every deflate call.
const CHUNK: usize = 8 * 1024;

/// Fixed gzip member header: deflate, no flags, no mtime, unknown OS.
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];

/// A concurrency-safe pool of compressors keyed by encoding.
///
/// ```rust
/// use plait::middleware::{CompressorPool, Encoding};
///
/// let pool = CompressorPool::with_limit(64);
/// {
///     let _gz = pool.acquire(Encoding::Gzip).unwrap();
///     assert_eq!(pool.outstanding(), 1);
/// }
/// assert_eq!(pool.outstanding(), 0);
/// assert_eq!(pool.idle(Encoding::Gzip), 1);
/// ```
pub struct CompressorPool {
    idle: Mutex<HashMap<Encoding, Vec<Compressor>>>,
    outstanding: AtomicUsize,
    limit: Option<usize>,
    level: Compression,
}

impl CompressorPool {
    /// Unbounded pool at the default compression level.
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            outstanding: AtomicUsize::new(0),
            limit: None,
            level: Compression::default(),
        }
    }

    /// Pool that refuses to hand out more than `limit` compressors at once.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::new() }
    }

    /// Compression level for compressors built from now on.
    pub fn level(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Takes an idle compressor for `encoding`, or builds one.
    ///
    /// Fails with [`Error::PoolExhausted`] when the limit is reached. The
    /// pool is unaffected by the failure.
    pub fn acquire(&self, encoding: Encoding) -> Result<PooledCompressor<'_>, Error> {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match self.limit {
                Some(limit) if n >= limit => None,
                _ => Some(n + 1),
            })
            .map_err(|_| Error::PoolExhausted(encoding))?;

        let reused = self.idle.lock().get_mut(&encoding).and_then(Vec::pop);
        let compressor = reused.unwrap_or_else(|| {
            trace!(%encoding, "allocating compressor");
            Compressor::new(encoding, self.level)
        });
        Ok(PooledCompressor { pool: self, compressor: Some(compressor) })
    }

    /// Compressors waiting for reuse.
    pub fn idle(&self, encoding: Encoding) -> usize {
        self.idle.lock().get(&encoding).map_or(0, Vec::len)
    }

    /// Compressors currently held by requests.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    fn release(&self, mut compressor: Compressor) {
        compressor.reset();
        self.idle.lock().entry(compressor.encoding).or_default().push(compressor);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for CompressorPool {
    fn default() -> Self { Self::new() }
}

/// A compressor on loan from a [`CompressorPool`]. Returned when dropped.
pub struct PooledCompressor<'a> {
    pool: &'a CompressorPool,
    compressor: Option<Compressor>,
}

impl PooledCompressor<'_> {
    pub fn encoding(&self) -> Encoding {
        self.get().encoding
    }

    /// Compresses `input`, appending whatever output is ready to `out`.
    pub(crate) fn write(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.get_mut().write(input, out)
    }

    /// Ends the stream, appending the remaining output and any trailer.
    pub(crate) fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.get_mut().finish(out)
    }

    fn get(&self) -> &Compressor {
        self.compressor.as_ref().expect("compressor present until drop")
    }

    fn get_mut(&mut self) -> &mut Compressor {
        self.compressor.as_mut().expect("compressor present until drop")
    }
}

impl Drop for PooledCompressor<'_> {
    fn drop(&mut self) {
        if let Some(compressor) = self.compressor.take() {
            self.pool.release(compressor);
        }
    }
}

// ── Compressor ────────────────────────────────────────────────────────────────

/// Raw deflate state plus the framing for one HTTP content-coding.
///
/// `deflate` is the zlib format (RFC 1950), which the deflate backend frames
/// itself. `gzip` (RFC 1952) is a raw stream between a fixed header and a
/// CRC-32 / length trailer, tracked here.
struct Compressor {
    encoding: Encoding,
    raw: Compress,
    crc: Crc,
    started: bool,
}

impl Compressor {
    fn new(encoding: Encoding, level: Compression) -> Self {
        Self {
            encoding,
            raw: Compress::new(level, matches!(encoding, Encoding::Deflate)),
            crc: Crc::new(),
            started: false,
        }
    }

    fn write(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.start(out);
        if matches!(self.encoding, Encoding::Gzip) {
            self.crc.update(input);
        }
        self.deflate(input, out, false)
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.start(out);
        self.deflate(&[], out, true)?;
        if matches!(self.encoding, Encoding::Gzip) {
            out.extend_from_slice(&self.crc.sum().to_le_bytes());
            out.extend_from_slice(&self.crc.amount().to_le_bytes());
        }
        Ok(())
    }

    fn start(&mut self, out: &mut Vec<u8>) {
        if !self.started {
            self.started = true;
            if matches!(self.encoding, Encoding::Gzip) {
                out.extend_from_slice(&GZIP_HEADER);
            }
        }
    }

    fn deflate(&mut self, mut input: &[u8], out: &mut Vec<u8>, finish: bool) -> io::Result<()> {
        loop {
            out.reserve(CHUNK);
            let flush = if finish { FlushCompress::Finish } else { FlushCompress::None };
            let before = self.raw.total_in();
            let status = self.raw.compress_vec(input, out, flush).map_err(io::Error::other)?;
            input = &input[(self.raw.total_in() - before) as usize..];

            let done = if finish { matches!(status, Status::StreamEnd) } else { input.is_empty() };
            if done {
                return Ok(());
            }
        }
    }

    fn reset(&mut self) {
        self.raw.reset();
        self.crc.reset();
        self.started = false;
    }
}
