//! Mapped strategy: a read-only shared mapping with a user-space cursor.
//!
//! The descriptor is closed as soon as the mapping exists; the mapping is
//! the only resource the stream holds. Seeks never touch the OS. The cursor
//! may move past the end; reads from there fail.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::ptr::NonNull;

use crate::error::{StreamError, StreamResult};
use crate::mode::{Whence, resolve_offset};

use super::raw::fstat_size;

/// Owned `PROT_READ` mapping, unmapped on drop.
#[derive(Debug)]
struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is read-only and exclusively owned.
unsafe impl Send for Mapping {}

impl Mapping {
    fn new(fd: &OwnedFd, len: usize) -> io::Result<Self> {
        // SAFETY: requesting a fresh read-only shared mapping of an open
        // descriptor; the kernel picks the address.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(addr.cast::<u8>())
            .map(|ptr| Self { ptr, len })
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOMEM))
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` addresses `len` readable bytes for the mapping's lifetime.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn unmap(self) -> io::Result<()> {
        let (ptr, len) = (self.ptr, self.len);
        std::mem::forget(self);
        // SAFETY: region came from mmap with this length; released once.
        if unsafe { libc::munmap(ptr.as_ptr().cast(), len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: `unmap` forgets `self`, so this is the only other release.
        unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len) };
    }
}

#[derive(Debug)]
pub(crate) struct MappedStream {
    map: Mapping,
    pos: u64,
}

impl MappedStream {
    /// Map the whole file behind `fd`. On failure the descriptor is handed
    /// back so the caller can degrade to the raw strategy.
    pub(crate) fn map(fd: OwnedFd) -> Result<Self, (OwnedFd, io::Error)> {
        let len = match fstat_size(fd.as_raw_fd()) {
            Ok(len) => len,
            Err(err) => {
                let source = match err {
                    StreamError::Io { source, .. } => source,
                    _ => io::Error::from_raw_os_error(libc::EIO),
                };
                return Err((fd, source));
            }
        };
        let Ok(len) = usize::try_from(len) else {
            return Err((fd, io::Error::from_raw_os_error(libc::EFBIG)));
        };
        // mmap(2) rejects zero-length mappings.
        if len == 0 {
            return Err((fd, io::Error::from_raw_os_error(libc::EINVAL)));
        }
        match Mapping::new(&fd, len) {
            Ok(map) => Ok(Self { map, pos: 0 }),
            Err(err) => Err((fd, err)),
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.map.len as u64
    }

    pub(crate) fn tell(&self) -> u64 {
        self.pos
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let next = match whence {
            Whence::Start => u64::try_from(offset).ok(),
            Whence::Current => resolve_offset(self.pos, offset),
            Whence::End => resolve_offset(self.len(), offset),
        };
        let Some(next) = next else {
            return Err(StreamError::InvalidSeek { offset, whence });
        };
        self.pos = next;
        Ok(next)
    }

    /// Copy out up to `buf.len()` bytes, clamped to what remains.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let len = self.len();
        if self.pos > len {
            return Err(StreamError::PastEnd {
                cursor: self.pos,
                len,
            });
        }
        let start = self.pos as usize;
        let n = buf.len().min(self.map.len - start);
        buf[..n].copy_from_slice(&self.map.as_slice()[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    pub(crate) fn close(self) -> StreamResult<()> {
        self.map.unmap().map_err(|e| StreamError::io("close", e))
    }
}
