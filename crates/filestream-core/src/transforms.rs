//! `fopen`-style veneer over `RFile`.
//!
//! Lets code written against the C stdio shapes (mode strings, element
//! counts, `fprintf`) run on top of the stream layer unchanged.

use crate::error::{StreamError, StreamResult};
use crate::mode::{Access, OpenMode, Whence};
use crate::stream::RFile;

/// A decoded `fopen` mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FopenMode {
    pub mode: OpenMode,
    /// Position the cursor at the end after opening (`a`, `a+`).
    pub append: bool,
}

/// Decode an `fopen` mode string.
///
/// | mode | access | creates | truncates |
/// |------|--------|---------|-----------|
/// | `r`  | read | no | no |
/// | `r+` | read-write | no | no |
/// | `w`, `w+` | read-write | yes | yes |
/// | `a`, `a+` | read-write | yes | no (cursor starts at end) |
///
/// `b` anywhere selects binary; without it reads are in text mode.
#[must_use]
pub fn parse_mode_str(mode: &str) -> Option<FopenMode> {
    let binary = mode.contains('b');
    let plus = mode.contains('+');
    let (open, append) = match mode.chars().next()? {
        'r' if plus => (OpenMode::new(Access::ReadWrite, binary, false, false), false),
        'r' => (OpenMode::new(Access::Read, binary, false, false), false),
        'w' => (OpenMode::new(Access::ReadWrite, binary, true, true), false),
        'a' => (OpenMode::new(Access::ReadWrite, binary, true, false), true),
        _ => return None,
    };
    Some(FopenMode { mode: open, append })
}

pub fn rfopen(path: &str, mode: &str) -> StreamResult<RFile> {
    let parsed = parse_mode_str(mode).ok_or(StreamError::Unsupported("fopen mode"))?;
    let mut file = RFile::open(path, parsed.mode)?;
    if parsed.append {
        file.seek(0, Whence::End)?;
    }
    Ok(file)
}

pub fn rfclose(file: RFile) -> StreamResult<()> {
    file.close()
}

pub fn rftell(file: &mut RFile) -> StreamResult<u64> {
    file.tell()
}

pub fn rfseek(file: &mut RFile, offset: i64, whence: Whence) -> StreamResult<()> {
    file.seek(offset, whence).map(drop)
}

/// Read up to `count` elements of `size` bytes; returns whole elements read.
pub fn rfread(file: &mut RFile, buf: &mut [u8], size: usize, count: usize) -> StreamResult<usize> {
    let Some(want) = element_span(buf.len(), size, count) else {
        return Ok(0);
    };
    let mut filled = 0;
    while filled < want {
        match file.read(&mut buf[filled..want])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled / size)
}

/// Write `count` elements of `size` bytes; returns whole elements written.
pub fn rfwrite(file: &mut RFile, buf: &[u8], size: usize, count: usize) -> StreamResult<usize> {
    let Some(want) = element_span(buf.len(), size, count) else {
        return Ok(0);
    };
    Ok(file.write(&buf[..want])? / size)
}

/// Bytes covered by `count` elements, capped to whole elements in `avail`.
fn element_span(avail: usize, size: usize, count: usize) -> Option<usize> {
    if size == 0 || count == 0 {
        return None;
    }
    let whole = (avail / size).min(count);
    Some(whole * size)
}

/// Fixed-length read into `buf`.
pub fn rfgets<'a>(file: &mut RFile, buf: &'a mut [u8]) -> StreamResult<&'a [u8]> {
    file.gets(buf)?;
    Ok(buf)
}

pub fn rfgetc(file: &mut RFile) -> StreamResult<Option<u8>> {
    file.getc()
}

pub fn rfputc(file: &mut RFile, byte: u8) -> StreamResult<()> {
    file.putc(byte)
}

#[must_use]
pub fn rferror(file: &RFile) -> bool {
    file.error()
}

pub fn rfeof(file: &mut RFile) -> StreamResult<bool> {
    file.eof()
}

/// `fprintf` over an `RFile`: `rfprintf!(file, "{} {}", a, b)`.
#[macro_export]
macro_rules! rfprintf {
    ($file:expr, $($arg:tt)*) => {
        $crate::RFile::printf($file, ::std::format_args!($($arg)*))
    };
}
