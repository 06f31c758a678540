//! Opaque `RFILE` handles and pointer helpers shared by the exports.

use std::ffi::{CStr, CString, c_char, c_int};

use filestream_core::{OpenMode, RFile, StreamError};
use tracing::debug;

/// Heap-allocated stream handed to C as `RFILE*`.
///
/// Path, extension and name are cached as C strings so the pointers returned
/// by the `get_*` queries stay valid until the handle is closed.
pub struct RFILE {
    file: RFile,
    path: CString,
    ext: Option<CString>,
    name: CString,
}

impl RFILE {
    fn new(file: RFile) -> Self {
        let path = CString::new(file.path()).unwrap_or_default();
        let ext = file.ext().and_then(|e| CString::new(e).ok());
        let name = CString::new(file.name()).unwrap_or_default();
        Self {
            file,
            path,
            ext,
            name,
        }
    }

    pub fn file(&mut self) -> &mut RFile {
        &mut self.file
    }

    pub fn path(&self) -> &CStr {
        &self.path
    }

    pub fn ext(&self) -> Option<&CStr> {
        self.ext.as_deref()
    }

    pub fn name(&self) -> &CStr {
        &self.name
    }

    pub(crate) fn into_file(self) -> RFile {
        self.file
    }
}

/// Box `file` and hand ownership to the caller.
pub(crate) fn into_raw(file: RFile) -> *mut RFILE {
    Box::into_raw(Box::new(RFILE::new(file)))
}

/// Borrow a handle. `None` for NULL.
///
/// # Safety
/// `stream` must be NULL or a live pointer returned by an open export.
pub(crate) unsafe fn handle<'a>(stream: *mut RFILE) -> Option<&'a mut RFILE> {
    // SAFETY: caller guarantees `stream` is NULL or live and unaliased.
    unsafe { stream.as_mut() }
}

/// Reclaim ownership of a handle. `None` for NULL.
///
/// # Safety
/// `stream` must be NULL or a live pointer returned by an open export; it is
/// invalid afterwards.
pub(crate) unsafe fn take(stream: *mut RFILE) -> Option<Box<RFILE>> {
    if stream.is_null() {
        return None;
    }
    // SAFETY: allocated by `into_raw` and not yet reclaimed.
    Some(unsafe { Box::from_raw(stream) })
}

/// Decode a C path. `None` for NULL or non-UTF-8.
///
/// # Safety
/// `path` must be NULL or a NUL-terminated string.
pub(crate) unsafe fn c_path<'a>(path: *const c_char) -> Option<&'a str> {
    if path.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    unsafe { CStr::from_ptr(path) }.to_str().ok()
}

/// Open `path` and box the result; NULL on failure.
///
/// # Safety
/// `path` must be NULL or a NUL-terminated string.
pub(crate) unsafe fn open_raw(path: *const c_char, mode: Option<OpenMode>) -> *mut RFILE {
    // SAFETY: forwarded caller contract.
    let Some(path) = (unsafe { c_path(path) }) else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };
    let Some(mode) = mode else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };
    match RFile::open(path, mode) {
        Ok(file) => into_raw(file),
        Err(err) => {
            report(&err);
            std::ptr::null_mut()
        }
    }
}

/// Log a failure and mirror its OS code into `errno`.
pub(crate) fn report(err: &StreamError) {
    debug!(error = %err, "filestream call failed");
    set_errno(errno_for(err));
}

fn errno_for(err: &StreamError) -> c_int {
    if let Some(code) = err.raw_os_error() {
        return code;
    }
    match err {
        StreamError::ReadOnly => libc::EBADF,
        StreamError::InvalidSeek { .. } | StreamError::InvalidPath | StreamError::NullHandle => {
            libc::EINVAL
        }
        StreamError::OutOfMemory => libc::ENOMEM,
        StreamError::Unsupported(_) => libc::ENOTSUP,
        StreamError::FormatOverflow { .. } => libc::EOVERFLOW,
        _ => libc::EIO,
    }
}

pub(crate) fn set_errno(code: c_int) {
    #[cfg(any(target_os = "linux", target_os = "emscripten"))]
    // SAFETY: __errno_location returns this thread's errno slot.
    unsafe {
        *libc::__errno_location() = code;
    }
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    // SAFETY: __error returns this thread's errno slot.
    unsafe {
        *libc::__error() = code;
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "emscripten",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd"
    )))]
    let _ = code;
}
