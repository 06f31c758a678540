//! Raw strategy: unbuffered reads and writes straight on a descriptor.

use std::ffi::CStr;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};

use crate::error::{StreamError, StreamResult};
use crate::mode::{CREATE_PERMISSIONS, Whence};

/// `open(2)` returning an owned descriptor.
pub(crate) fn open_fd(path: &CStr, oflags: i32) -> io::Result<OwnedFd> {
    // SAFETY: `path` is NUL-terminated; the mode argument is only read when
    // O_CREAT is present.
    let fd = unsafe { libc::open(path.as_ptr(), oflags, libc::c_uint::from(CREATE_PERMISSIONS)) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` was just returned by open(2) and is owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Current on-disk size of an open descriptor.
pub(crate) fn fstat_size(fd: libc::c_int) -> StreamResult<u64> {
    // SAFETY: all-zero is a valid `stat` value to be overwritten by fstat.
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: `st` is a valid out-pointer.
    if unsafe { libc::fstat(fd, &mut st) } != 0 {
        return Err(StreamError::last_os("size"));
    }
    u64::try_from(st.st_size).map_err(|_| StreamError::io("size", io::Error::from_raw_os_error(libc::EOVERFLOW)))
}

fn retry_eintr(mut op: impl FnMut() -> libc::ssize_t) -> io::Result<usize> {
    loop {
        let rc = op();
        if rc >= 0 {
            return Ok(rc as usize);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

#[derive(Debug)]
pub(crate) struct RawStream {
    fd: OwnedFd,
}

impl RawStream {
    pub(crate) fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    fn lseek(&self, offset: i64, whence: Whence, op: &'static str) -> StreamResult<u64> {
        // SAFETY: descriptor is owned by `self`.
        let pos = unsafe { libc::lseek(self.fd.as_raw_fd(), offset as libc::off_t, whence.to_raw()) };
        u64::try_from(pos).map_err(|_| StreamError::last_os(op))
    }

    pub(crate) fn tell(&mut self) -> StreamResult<u64> {
        self.lseek(0, Whence::Current, "tell")
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        self.lseek(offset, whence, "seek")
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let fd = self.fd.as_raw_fd();
        // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
        retry_eintr(|| unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) })
            .map_err(|e| StreamError::io("read", e))
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let fd = self.fd.as_raw_fd();
        // SAFETY: `buf` is valid for `buf.len()` bytes of reads.
        retry_eintr(|| unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) })
            .map_err(|e| StreamError::io("write", e))
    }

    pub(crate) fn size(&mut self) -> StreamResult<u64> {
        fstat_size(self.fd.as_raw_fd())
    }

    pub(crate) fn truncate(&mut self, len: u64) -> StreamResult<()> {
        let len = libc::off_t::try_from(len).map_err(|_| {
            StreamError::io("truncate", io::Error::from_raw_os_error(libc::EFBIG))
        })?;
        // SAFETY: descriptor is owned by `self`.
        if unsafe { libc::ftruncate(self.fd.as_raw_fd(), len) } != 0 {
            return Err(StreamError::last_os("truncate"));
        }
        Ok(())
    }

    /// Close, reporting a failing `close(2)`.
    pub(crate) fn close(self) -> StreamResult<()> {
        let fd = self.fd.into_raw_fd();
        // SAFETY: ownership was released by `into_raw_fd`; closed once here.
        if unsafe { libc::close(fd) } != 0 {
            return Err(StreamError::last_os("close"));
        }
        Ok(())
    }
}
