//! Buffered strategy: a C stdio `FILE*` layered over an owned descriptor.

use std::ffi::CStr;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::ptr::NonNull;

use crate::error::{StreamError, StreamResult};
use crate::mode::Whence;

use super::raw::fstat_size;

/// Owned stdio stream. Closed exactly once, by `close` or on drop.
#[derive(Debug)]
pub(crate) struct BufferedStream {
    fp: NonNull<libc::FILE>,
}

// SAFETY: the FILE is exclusively owned by this value and stdio streams may
// be used from any thread; callers serialize access through `&mut self`.
unsafe impl Send for BufferedStream {}

impl BufferedStream {
    /// Wrap `fd` in a stdio stream. On failure the descriptor is closed.
    pub(crate) fn from_fd(fd: OwnedFd, mode: &CStr) -> io::Result<Self> {
        // SAFETY: `fd` is a live descriptor and `mode` is NUL-terminated.
        let fp = unsafe { libc::fdopen(fd.as_raw_fd(), mode.as_ptr()) };
        match NonNull::new(fp) {
            Some(fp) => {
                // The FILE now owns the descriptor.
                let _ = fd.into_raw_fd();
                Ok(Self { fp })
            }
            None => Err(io::Error::last_os_error()),
        }
    }

    fn as_ptr(&self) -> *mut libc::FILE {
        self.fp.as_ptr()
    }

    pub(crate) fn tell(&mut self) -> StreamResult<u64> {
        // SAFETY: `fp` is an open stream owned by `self`.
        let pos = unsafe { libc::ftello(self.as_ptr()) };
        u64::try_from(pos).map_err(|_| StreamError::last_os("tell"))
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        // SAFETY: `fp` is an open stream owned by `self`.
        let rc = unsafe { libc::fseeko(self.as_ptr(), offset as libc::off_t, whence.to_raw()) };
        if rc != 0 {
            return Err(StreamError::last_os("seek"));
        }
        self.tell()
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
        let n = unsafe { libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), self.as_ptr()) };
        if n == 0 && self.error() {
            return Err(StreamError::last_os("read"));
        }
        Ok(n)
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // SAFETY: `buf` is valid for `buf.len()` bytes of reads.
        let n = unsafe { libc::fwrite(buf.as_ptr().cast(), 1, buf.len(), self.as_ptr()) };
        if n == 0 && self.error() {
            return Err(StreamError::last_os("write"));
        }
        Ok(n)
    }

    pub(crate) fn flush(&mut self) -> StreamResult<()> {
        // SAFETY: `fp` is an open stream owned by `self`.
        if unsafe { libc::fflush(self.as_ptr()) } != 0 {
            return Err(StreamError::last_os("flush"));
        }
        Ok(())
    }

    pub(crate) fn error(&self) -> bool {
        // SAFETY: `fp` is an open stream owned by `self`.
        unsafe { libc::ferror(self.as_ptr()) != 0 }
    }

    fn fd(&self) -> libc::c_int {
        // SAFETY: `fp` is an open stream owned by `self`.
        unsafe { libc::fileno(self.as_ptr()) }
    }

    /// On-disk size, after pushing buffered writes down.
    pub(crate) fn size(&mut self) -> StreamResult<u64> {
        self.flush()?;
        fstat_size(self.fd())
    }

    pub(crate) fn truncate(&mut self, len: u64) -> StreamResult<()> {
        self.flush()?;
        let len = libc::off_t::try_from(len).map_err(|_| {
            StreamError::io("truncate", io::Error::from_raw_os_error(libc::EFBIG))
        })?;
        // SAFETY: descriptor belongs to the open stream.
        if unsafe { libc::ftruncate(self.fd(), len) } != 0 {
            return Err(StreamError::last_os("truncate"));
        }
        Ok(())
    }

    /// Flush and close. The stream is released even if flushing fails.
    pub(crate) fn close(self) -> StreamResult<()> {
        let fp = self.as_ptr();
        std::mem::forget(self);
        // SAFETY: ownership of `fp` was taken from `self`; it is closed once.
        if unsafe { libc::fclose(fp) } != 0 {
            return Err(StreamError::last_os("close"));
        }
        Ok(())
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) {
        // SAFETY: `close` forgets `self`, so this is the only other release.
        unsafe { libc::fclose(self.as_ptr()) };
    }
}
