//! Host VFS interface: a C function table adapted into a `FileBackend`.
//!
//! The host answers an environment query with a table of function
//! pointers. `filestream_vfs_init` installs it as the process-wide backend,
//! or clears the backend slot when the host declines.

use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use std::io;
use std::ptr::NonNull;
use std::sync::Arc;

use filestream_core::dispatch::size_by_seeking;
use filestream_core::{
    BackendFile, FileBackend, HostEnvironment, OpenMode, StreamError, StreamResult, Whence,
    init_from_environment,
};
use tracing::{debug, warn};

/// Experimental-command bit of the environment protocol.
pub const RETRO_ENVIRONMENT_EXPERIMENTAL: c_uint = 0x10000;
/// Environment command that fills a [`RetroVfsInterfaceInfo`].
pub const RETRO_ENVIRONMENT_GET_VFS_INTERFACE: c_uint = 45 | RETRO_ENVIRONMENT_EXPERIMENTAL;
/// Interface version this crate asks the host for.
pub const FILESTREAM_REQUIRED_VFS_VERSION: u32 = 1;

/// Host-side stream; opaque to this crate.
#[repr(C)]
pub struct RetroVfsFileHandle {
    _private: [u8; 0],
}

pub type RetroVfsGetPathFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> *const c_char;
pub type RetroVfsOpenFn = unsafe extern "C" fn(*const c_char, c_uint, c_uint) -> *mut RetroVfsFileHandle;
pub type RetroVfsCloseFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> c_int;
pub type RetroVfsSizeFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> i64;
pub type RetroVfsTruncateFn = unsafe extern "C" fn(*mut RetroVfsFileHandle, i64) -> i64;
pub type RetroVfsTellFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> i64;
pub type RetroVfsSeekFn = unsafe extern "C" fn(*mut RetroVfsFileHandle, i64, c_int) -> i64;
pub type RetroVfsReadFn = unsafe extern "C" fn(*mut RetroVfsFileHandle, *mut c_void, u64) -> i64;
pub type RetroVfsWriteFn = unsafe extern "C" fn(*mut RetroVfsFileHandle, *const c_void, u64) -> i64;
pub type RetroVfsFlushFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> c_int;
pub type RetroVfsErrorFn = unsafe extern "C" fn(*mut RetroVfsFileHandle) -> c_int;

/// Function table supplied by the host. `open` and `close` are required.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RetroVfsInterface {
    pub get_path: Option<RetroVfsGetPathFn>,
    pub open: Option<RetroVfsOpenFn>,
    pub close: Option<RetroVfsCloseFn>,
    pub size: Option<RetroVfsSizeFn>,
    pub truncate: Option<RetroVfsTruncateFn>,
    pub tell: Option<RetroVfsTellFn>,
    pub seek: Option<RetroVfsSeekFn>,
    pub read: Option<RetroVfsReadFn>,
    pub write: Option<RetroVfsWriteFn>,
    pub flush: Option<RetroVfsFlushFn>,
    pub error: Option<RetroVfsErrorFn>,
}

/// Query block passed to the environment callback.
#[repr(C)]
pub struct RetroVfsInterfaceInfo {
    pub required_interface_version: u32,
    pub iface: *const RetroVfsInterface,
}

pub type RetroEnvironmentFn = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;

// ---------------------------------------------------------------------------
// Backend adapter
// ---------------------------------------------------------------------------

/// A host function table exposed as a `FileBackend`.
pub struct FfiBackend {
    iface: RetroVfsInterface,
}

impl FfiBackend {
    /// `None` unless both `open` and `close` are present.
    #[must_use]
    pub fn new(iface: RetroVfsInterface) -> Option<Self> {
        (iface.open.is_some() && iface.close.is_some()).then_some(Self { iface })
    }
}

impl FileBackend for FfiBackend {
    fn name(&self) -> &str {
        "host-vfs"
    }

    fn open(&self, path: &str, mode: OpenMode) -> StreamResult<Box<dyn BackendFile>> {
        let open = self.iface.open.ok_or(StreamError::Unsupported("open"))?;
        let c_path = CString::new(path).map_err(|_| StreamError::InvalidPath)?;
        let (access, hints) = mode.to_vfs_bits();
        // SAFETY: host contract; `c_path` outlives the call.
        let raw = unsafe { open(c_path.as_ptr(), access, hints) };
        let Some(handle) = NonNull::new(raw) else {
            return Err(StreamError::Open {
                path: path.to_owned(),
                source: io::Error::other("host interface returned no handle"),
            });
        };
        let path = host_path(&self.iface, handle).unwrap_or_else(|| path.to_owned());
        Ok(Box::new(FfiFile {
            iface: self.iface,
            handle: Some(handle),
            path,
        }))
    }
}

fn host_path(iface: &RetroVfsInterface, handle: NonNull<RetroVfsFileHandle>) -> Option<String> {
    let get_path = iface.get_path?;
    // SAFETY: host contract; `handle` is live.
    let ptr = unsafe { get_path(handle.as_ptr()) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: host returns a NUL-terminated string valid for this call.
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_owned)
}

struct FfiFile {
    iface: RetroVfsInterface,
    handle: Option<NonNull<RetroVfsFileHandle>>,
    path: String,
}

// SAFETY: the host handle is exclusively owned by this value and only used
// through `&mut self`; host interfaces are callable from any thread.
unsafe impl Send for FfiFile {}

impl FfiFile {
    fn raw(&self) -> *mut RetroVfsFileHandle {
        self.handle.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    fn offset(rc: i64, op: &'static str) -> StreamResult<u64> {
        u64::try_from(rc).map_err(|_| StreamError::Backend { op })
    }
}

impl BackendFile for FfiFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn tell(&mut self) -> StreamResult<u64> {
        let tell = self.iface.tell.ok_or(StreamError::Unsupported("tell"))?;
        // SAFETY: host contract; handle is live until close.
        Self::offset(unsafe { tell(self.raw()) }, "tell")
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let seek = self.iface.seek.ok_or(StreamError::Unsupported("seek"))?;
        // SAFETY: host contract; handle is live until close.
        Self::offset(unsafe { seek(self.raw(), offset, whence.to_raw()) }, "seek")
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let read = self.iface.read.ok_or(StreamError::Unsupported("read"))?;
        // SAFETY: `buf` is writable for its length; handle is live.
        let rc = unsafe { read(self.raw(), buf.as_mut_ptr().cast(), buf.len() as u64) };
        usize::try_from(rc).map_err(|_| StreamError::Backend { op: "read" })
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let write = self.iface.write.ok_or(StreamError::Unsupported("write"))?;
        // SAFETY: `buf` is readable for its length; handle is live.
        let rc = unsafe { write(self.raw(), buf.as_ptr().cast(), buf.len() as u64) };
        usize::try_from(rc).map_err(|_| StreamError::Backend { op: "write" })
    }

    fn flush(&mut self) -> StreamResult<()> {
        let Some(flush) = self.iface.flush else {
            return Ok(());
        };
        // SAFETY: host contract; handle is live until close.
        match unsafe { flush(self.raw()) } {
            0 => Ok(()),
            _ => Err(StreamError::Backend { op: "flush" }),
        }
    }

    fn error(&self) -> bool {
        match self.iface.error {
            // SAFETY: host contract; handle is live until close.
            Some(error) => unsafe { error(self.raw()) != 0 },
            None => false,
        }
    }

    fn size(&mut self) -> StreamResult<u64> {
        match self.iface.size {
            // SAFETY: host contract; handle is live until close.
            Some(size) => Self::offset(unsafe { size(self.raw()) }, "size"),
            None => size_by_seeking(self),
        }
    }

    fn truncate(&mut self, len: u64) -> StreamResult<()> {
        let truncate = self.iface.truncate.ok_or(StreamError::Unsupported("truncate"))?;
        let len = i64::try_from(len).map_err(|_| StreamError::Backend { op: "truncate" })?;
        // SAFETY: host contract; handle is live until close.
        match unsafe { truncate(self.raw(), len) } {
            rc if rc < 0 => Err(StreamError::Backend { op: "truncate" }),
            _ => Ok(()),
        }
    }

    fn close(mut self: Box<Self>) -> StreamResult<()> {
        let (Some(close), Some(handle)) = (self.iface.close, self.handle.take()) else {
            return Ok(());
        };
        // SAFETY: handle is live and released exactly once here.
        match unsafe { close(handle.as_ptr()) } {
            0 => Ok(()),
            _ => Err(StreamError::Backend { op: "close" }),
        }
    }
}

impl Drop for FfiFile {
    fn drop(&mut self) {
        if let (Some(close), Some(handle)) = (self.iface.close, self.handle.take()) {
            // SAFETY: `close` takes the handle, so this is the only other release.
            unsafe { close(handle.as_ptr()) };
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Environment callback wrapped as a `HostEnvironment`.
pub struct CallbackEnvironment {
    callback: Option<RetroEnvironmentFn>,
}

impl CallbackEnvironment {
    #[must_use]
    pub fn new(callback: Option<RetroEnvironmentFn>) -> Self {
        Self { callback }
    }
}

impl HostEnvironment for CallbackEnvironment {
    fn vfs_interface(&self) -> Option<Arc<dyn FileBackend>> {
        let callback = self.callback?;
        let mut info = RetroVfsInterfaceInfo {
            required_interface_version: FILESTREAM_REQUIRED_VFS_VERSION,
            iface: std::ptr::null(),
        };
        // SAFETY: host contract; `info` is a valid query block for this command.
        let answered = unsafe {
            callback(
                RETRO_ENVIRONMENT_GET_VFS_INTERFACE,
                (&raw mut info).cast::<c_void>(),
            )
        };
        if !answered || info.iface.is_null() {
            debug!("host did not provide a VFS interface");
            return None;
        }
        // SAFETY: host filled `iface` with a pointer to a live table.
        let iface = unsafe { *info.iface };
        match FfiBackend::new(iface) {
            Some(backend) => Some(Arc::new(backend)),
            None => {
                warn!("host VFS interface lacks open/close, using fallback engine");
                None
            }
        }
    }
}

/// Ask the host for its VFS interface and install it as the backend.
///
/// Returns `true` if a host backend is now registered. Otherwise the slot is
/// cleared and every stream is served by the fallback engine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_vfs_init(get_env: Option<RetroEnvironmentFn>) -> bool {
    init_from_environment(&CallbackEnvironment::new(get_env))
}
