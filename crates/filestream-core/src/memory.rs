//! In-memory backend.
//!
//! Files live in a shared map of byte vectors. Useful for hosts that serve
//! content from memory and for exercising the dispatch layer without
//! touching disk.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{BackendFile, FileBackend};
use crate::error::{StreamError, StreamResult};
use crate::mode::{Access, OpenMode, Whence, resolve_offset};

type Contents = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: Mutex<HashMap<String, Contents>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace `path`.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .insert(path.into(), Arc::new(Mutex::new(data.into())));
    }

    /// Snapshot of `path`'s bytes.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|c| c.lock().clone())
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }
}

fn not_found(path: &str) -> StreamError {
    StreamError::Open {
        path: path.to_owned(),
        source: io::Error::from_raw_os_error(libc::ENOENT),
    }
}

impl FileBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, path: &str, mode: OpenMode) -> StreamResult<Box<dyn BackendFile>> {
        let mut files = self.files.lock();
        let data = match files.get(path) {
            Some(existing) => {
                if mode.access != Access::Read && mode.replace_existing {
                    existing.lock().clear();
                }
                Arc::clone(existing)
            }
            None if mode.access == Access::Write || mode.create_new => {
                let fresh = Contents::default();
                files.insert(path.to_owned(), Arc::clone(&fresh));
                fresh
            }
            None => return Err(not_found(path)),
        };
        Ok(Box::new(MemoryFile {
            path: path.to_owned(),
            data,
            pos: 0,
            readable: mode.access != Access::Write,
            writable: mode.access != Access::Read,
            faulted: false,
        }))
    }
}

/// Zero-fill `data` up to `len` bytes. Allocation failure is an error value.
fn grow(data: &mut Vec<u8>, len: usize) -> StreamResult<()> {
    if len > data.len() {
        data.try_reserve(len - data.len())
            .map_err(|_| StreamError::OutOfMemory)?;
        data.resize(len, 0);
    }
    Ok(())
}

#[derive(Debug)]
struct MemoryFile {
    path: String,
    data: Contents,
    pos: u64,
    readable: bool,
    writable: bool,
    faulted: bool,
}

impl MemoryFile {
    fn bad_descriptor(&mut self, op: &'static str) -> StreamError {
        self.faulted = true;
        StreamError::io(op, io::Error::from_raw_os_error(libc::EBADF))
    }
}

impl BackendFile for MemoryFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn tell(&mut self) -> StreamResult<u64> {
        Ok(self.pos)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.pos,
            Whence::End => self.data.lock().len() as u64,
        };
        let Some(next) = resolve_offset(base, offset) else {
            self.faulted = true;
            return Err(StreamError::InvalidSeek { offset, whence });
        };
        self.pos = next;
        Ok(next)
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        if !self.readable {
            return Err(self.bad_descriptor("read"));
        }
        let data = self.data.lock();
        let start = usize::try_from(self.pos).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        drop(data);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        if !self.writable {
            return Err(self.bad_descriptor("write"));
        }
        let Ok(start) = usize::try_from(self.pos) else {
            return Err(self.bad_descriptor("write"));
        };
        let Some(end) = start.checked_add(buf.len()) else {
            self.faulted = true;
            return Err(StreamError::OutOfMemory);
        };
        let mut data = self.data.lock();
        if let Err(err) = grow(&mut data, end) {
            self.faulted = true;
            return Err(err);
        }
        data[start..end].copy_from_slice(buf);
        drop(data);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn error(&self) -> bool {
        self.faulted
    }

    fn size(&mut self) -> StreamResult<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn truncate(&mut self, len: u64) -> StreamResult<()> {
        if !self.writable {
            return Err(self.bad_descriptor("truncate"));
        }
        let Ok(len) = usize::try_from(len) else {
            return Err(self.bad_descriptor("truncate"));
        };
        let mut data = self.data.lock();
        if len <= data.len() {
            data.truncate(len);
            return Ok(());
        }
        grow(&mut data, len).inspect_err(|_| self.faulted = true)
    }

    fn close(self: Box<Self>) -> StreamResult<()> {
        Ok(())
    }
}
