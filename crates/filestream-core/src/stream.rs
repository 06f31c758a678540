//! `RFile`: the public stream handle.
//!
//! Primitives forward to the backend object captured at open. Everything
//! else (eof, rewind, line and byte I/O, formatted writes, path queries) is
//! computed here from those primitives, so every backend gets identical
//! behavior for free.

use std::fmt;
use std::io;

use crate::config::{EngineConfig, engine_config};
use crate::dispatch::{BackendFile, FileBackend, fallback_backend, registered_backend};
use crate::error::{StreamError, StreamResult};
use crate::fallback::StrategyKind;
use crate::mode::{OpenMode, Whence};

/// An open stream.
///
/// Dropping an `RFile` without calling [`RFile::close`] still releases the
/// underlying resource; `close` additionally reports whether that succeeded.
pub struct RFile {
    inner: Box<dyn BackendFile>,
    config: EngineConfig,
}

impl fmt::Debug for RFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RFile")
            .field("path", &self.inner.path())
            .field("strategy", &self.inner.strategy())
            .finish()
    }
}

impl RFile {
    /// Open through the registered backend, or the fallback engine.
    pub fn open(path: &str, mode: OpenMode) -> StreamResult<Self> {
        match registered_backend() {
            Some(backend) => Self::open_with(backend.as_ref(), path, mode),
            None => Self::open_with(fallback_backend(), path, mode),
        }
    }

    /// Open with a legacy `RFILE_MODE_* | RFILE_HINT_*` bitmask.
    pub fn open_legacy(path: &str, bits: u32) -> StreamResult<Self> {
        let mode = OpenMode::from_legacy_bits(bits).ok_or(StreamError::Unsupported("open mode"))?;
        Self::open(path, mode)
    }

    /// Open through an explicit backend, bypassing the process-wide slot.
    /// The stream uses that backend's [`EngineConfig`].
    pub fn open_with(backend: &dyn FileBackend, path: &str, mode: OpenMode) -> StreamResult<Self> {
        let inner = backend.open(path, mode)?;
        Ok(Self::with_config(inner, backend.config()))
    }

    /// Wrap a backend object, using the process-wide configuration.
    #[must_use]
    pub fn from_backend_file(inner: Box<dyn BackendFile>) -> Self {
        Self::with_config(inner, *engine_config())
    }

    #[must_use]
    pub fn with_config(inner: Box<dyn BackendFile>, config: EngineConfig) -> Self {
        Self { inner, config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn close(self) -> StreamResult<()> {
        self.inner.close()
    }

    // -- primitives ---------------------------------------------------------

    #[must_use]
    pub fn error(&self) -> bool {
        self.inner.error()
    }

    pub fn tell(&mut self) -> StreamResult<u64> {
        self.inner.tell()
    }

    /// Move the cursor; returns the resulting absolute offset.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        self.inner.seek(offset, whence)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        self.inner.read(buf)
    }

    pub fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        self.inner.write(buf)
    }

    pub fn flush(&mut self) -> StreamResult<()> {
        self.inner.flush()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn size(&mut self) -> StreamResult<u64> {
        self.inner.size()
    }

    pub fn truncate(&mut self, len: u64) -> StreamResult<()> {
        self.inner.truncate(len)
    }

    /// Fallback strategy in use, or `None` for a registered backend.
    #[must_use]
    pub fn strategy(&self) -> Option<StrategyKind> {
        self.inner.strategy()
    }

    // -- derived operations -------------------------------------------------

    /// True once the cursor is at or beyond the end. The cursor is unchanged.
    pub fn eof(&mut self) -> StreamResult<bool> {
        let here = self.tell()?;
        Ok(here >= self.size()?)
    }

    pub fn rewind(&mut self) {
        let _ = self.seek(0, Whence::Start);
    }

    /// Text after the last `.` of the final path component.
    #[must_use]
    pub fn ext(&self) -> Option<&str> {
        path_extension(self.path())
    }

    /// Final path component.
    #[must_use]
    pub fn name(&self) -> &str {
        path_basename(self.path())
    }

    /// One byte, or `None` at end of stream.
    pub fn getc(&mut self) -> StreamResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    pub fn putc(&mut self, byte: u8) -> StreamResult<()> {
        match self.write(&[byte])? {
            1 => Ok(()),
            actual => Err(StreamError::ShortWrite { expected: 1, actual }),
        }
    }

    /// Write a string without a terminator; returns the bytes written.
    pub fn puts(&mut self, s: &str) -> StreamResult<usize> {
        self.write(s.as_bytes())
    }

    /// Read the next line without its `\n`.
    ///
    /// Returns `None` only when the stream is exhausted before any byte is
    /// read. A final unterminated line is returned whole.
    pub fn getline_bytes(&mut self) -> StreamResult<Option<Vec<u8>>> {
        let Some(mut byte) = self.getc()? else {
            return Ok(None);
        };
        let mut line = Vec::new();
        line.try_reserve_exact(self.config.getline_initial_capacity.max(1))
            .map_err(|_| StreamError::OutOfMemory)?;
        while byte != b'\n' {
            if line.len() == line.capacity() {
                line.try_reserve_exact(line.capacity())
                    .map_err(|_| StreamError::OutOfMemory)?;
            }
            line.push(byte);
            match self.getc()? {
                Some(next) => byte = next,
                None => break,
            }
        }
        Ok(Some(line))
    }

    /// [`RFile::getline_bytes`] decoded as UTF-8, replacing invalid sequences.
    pub fn getline(&mut self) -> StreamResult<Option<String>> {
        Ok(self
            .getline_bytes()?
            .map(|line| String::from_utf8_lossy(&line).into_owned()))
    }

    /// Fill `buf` completely or fail with [`StreamError::ShortRead`].
    pub fn read_exact_into(&mut self, buf: &mut [u8]) -> StreamResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if filled != buf.len() {
            return Err(StreamError::ShortRead {
                expected: buf.len(),
                actual: filled,
            });
        }
        Ok(())
    }

    /// Fixed-length read: succeeds only if `buf.len()` bytes were read.
    pub fn gets(&mut self, buf: &mut [u8]) -> StreamResult<()> {
        self.read_exact_into(buf)
    }

    /// Render `args` into a bounded buffer and write it with one call.
    ///
    /// Output longer than the configured ceiling is refused without writing.
    /// Empty output writes nothing and returns 0.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> StreamResult<usize> {
        let rendered = render_bounded(args, self.config.printf_limit)?;
        if rendered.is_empty() {
            return Ok(0);
        }
        self.write(&rendered)
    }
}

struct BoundedBuf {
    buf: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl fmt::Write for BoundedBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.limit {
            self.overflowed = true;
            return Err(fmt::Error);
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

pub(crate) fn render_bounded(args: fmt::Arguments<'_>, limit: usize) -> StreamResult<Vec<u8>> {
    let mut out = BoundedBuf {
        buf: Vec::new(),
        limit,
        overflowed: false,
    };
    if fmt::write(&mut out, args).is_err() {
        return Err(if out.overflowed {
            StreamError::FormatOverflow { limit }
        } else {
            StreamError::Format
        });
    }
    Ok(out.buf)
}

fn path_basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}

fn path_extension(path: &str) -> Option<&str> {
    let name = path_basename(path);
    name.rfind('.').map(|dot| &name[dot + 1..])
}

impl io::Read for RFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(RFile::read(self, buf)?)
    }
}

impl io::Write for RFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(RFile::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(RFile::flush(self)?)
    }
}

impl io::Seek for RFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => (
                i64::try_from(n).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?,
                Whence::Start,
            ),
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        Ok(RFile::seek(self, offset, whence)?)
    }
}
