//! `filestream_*` exports.
//!
//! Every function accepts a NULL handle and answers with the failure
//! sentinel: `-1` for integer results, NULL for pointers, `EOF` for the byte
//! functions. On failure `errno` carries the OS code when one exists.

use std::ffi::{c_char, c_int, c_uint, c_void};

use filestream_core::{OpenMode, StreamError, Whence, read_file, write_file};

use crate::handle::{RFILE, c_path, handle, open_raw, report, set_errno, take};

fn sentinel<T: TryInto<i64>>(result: Result<T, StreamError>) -> i64 {
    match result {
        Ok(v) => v.try_into().unwrap_or(-1),
        Err(err) => {
            report(&err);
            -1
        }
    }
}

fn status(result: Result<(), StreamError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            -1
        }
    }
}

/// Open with host-style access bits (`1` read, `2` write, `3` read-write,
/// `| 4` to keep existing contents) and hints (`1` frequent access).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_open(path: *const c_char, access: c_uint, hints: c_uint) -> *mut RFILE {
    // SAFETY: forwarded caller contract on `path`.
    unsafe { open_raw(path, OpenMode::from_vfs_bits(access, hints)) }
}

/// Open with a legacy `RFILE_MODE_* | RFILE_HINT_*` bitmask.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_open_legacy(path: *const c_char, mode: c_uint) -> *mut RFILE {
    // SAFETY: forwarded caller contract on `path`.
    unsafe { open_raw(path, OpenMode::from_legacy_bits(mode)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_close(stream: *mut RFILE) -> c_int {
    // SAFETY: caller passes a handle from an open export, or NULL.
    let Some(boxed) = (unsafe { take(stream) }) else {
        return -1;
    };
    status(boxed.into_file().close())
}

/// Nonzero if a previous operation on `stream` failed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_error(stream: *mut RFILE) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    match unsafe { handle(stream) } {
        Some(h) => c_int::from(h.file().error()),
        None => -1,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_tell(stream: *mut RFILE) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    sentinel(h.file().tell())
}

/// Returns the resulting absolute offset.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_seek(stream: *mut RFILE, offset: i64, whence: c_int) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    let Some(whence) = Whence::from_raw(whence) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    sentinel(h.file().seek(offset, whence))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_read(stream: *mut RFILE, s: *mut c_void, len: u64) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    let Ok(len) = usize::try_from(len) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    if len == 0 {
        return 0;
    }
    if s.is_null() {
        set_errno(libc::EFAULT);
        return -1;
    }
    // SAFETY: caller guarantees `s` is writable for `len` bytes.
    let buf = unsafe { std::slice::from_raw_parts_mut(s.cast::<u8>(), len) };
    sentinel(h.file().read(buf))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_write(stream: *mut RFILE, s: *const c_void, len: u64) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    let Ok(len) = usize::try_from(len) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    if len == 0 {
        return 0;
    }
    if s.is_null() {
        set_errno(libc::EFAULT);
        return -1;
    }
    // SAFETY: caller guarantees `s` is readable for `len` bytes.
    let buf = unsafe { std::slice::from_raw_parts(s.cast::<u8>(), len) };
    sentinel(h.file().write(buf))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_flush(stream: *mut RFILE) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    status(h.file().flush())
}

/// Path the stream was opened with. Valid until close.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_get_path(stream: *mut RFILE) -> *const c_char {
    // SAFETY: caller passes a live handle or NULL.
    match unsafe { handle(stream) } {
        Some(h) => h.path().as_ptr(),
        None => std::ptr::null(),
    }
}

/// Extension without the dot, or NULL if the name has none.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_get_ext(stream: *mut RFILE) -> *const c_char {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return std::ptr::null();
    };
    h.ext().map_or(std::ptr::null(), |ext| ext.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_get_name(stream: *mut RFILE) -> *const c_char {
    // SAFETY: caller passes a live handle or NULL.
    match unsafe { handle(stream) } {
        Some(h) => h.name().as_ptr(),
        None => std::ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_get_size(stream: *mut RFILE) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    sentinel(h.file().size())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_truncate(stream: *mut RFILE, length: i64) -> i64 {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    let Ok(length) = u64::try_from(length) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    i64::from(status(h.file().truncate(length)))
}

/// `1` at end of stream, `0` otherwise, `-1` on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_eof(stream: *mut RFILE) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    match h.file().eof() {
        Ok(at_end) => c_int::from(at_end),
        Err(err) => {
            report(&err);
            -1
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_rewind(stream: *mut RFILE) {
    // SAFETY: caller passes a live handle or NULL.
    if let Some(h) = unsafe { handle(stream) } {
        h.file().rewind();
    }
}

/// Next line without its newline, as a `malloc`'d string the caller frees.
/// NULL at end of stream or on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_getline(stream: *mut RFILE) -> *mut c_char {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return std::ptr::null_mut();
    };
    let line = match h.file().getline_bytes() {
        Ok(Some(line)) => line,
        Ok(None) => return std::ptr::null_mut(),
        Err(err) => {
            report(&err);
            return std::ptr::null_mut();
        }
    };
    // SAFETY: plain allocation; checked for NULL below.
    let out = unsafe { libc::malloc(line.len() + 1) }.cast::<u8>();
    if out.is_null() {
        set_errno(libc::ENOMEM);
        return std::ptr::null_mut();
    }
    // SAFETY: `out` holds `line.len() + 1` bytes and does not overlap `line`.
    unsafe {
        std::ptr::copy_nonoverlapping(line.as_ptr(), out, line.len());
        *out.add(line.len()) = 0;
    }
    out.cast()
}

/// Read exactly `len` bytes into `s`. Returns `s`, or NULL on a short read.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_gets(stream: *mut RFILE, s: *mut c_char, len: u64) -> *mut c_char {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return std::ptr::null_mut();
    };
    let Ok(len) = usize::try_from(len) else {
        return std::ptr::null_mut();
    };
    if s.is_null() && len != 0 {
        return std::ptr::null_mut();
    }
    let buf: &mut [u8] = if len == 0 {
        &mut []
    } else {
        // SAFETY: caller guarantees `s` is writable for `len` bytes.
        unsafe { std::slice::from_raw_parts_mut(s.cast::<u8>(), len) }
    };
    match h.file().gets(buf) {
        Ok(()) => s,
        Err(err) => {
            report(&err);
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_getc(stream: *mut RFILE) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return libc::EOF;
    };
    match h.file().getc() {
        Ok(Some(byte)) => c_int::from(byte),
        Ok(None) => libc::EOF,
        Err(err) => {
            report(&err);
            libc::EOF
        }
    }
}

/// Write the low byte of `c`; returns it, or `EOF`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_putc(stream: *mut RFILE, c: c_int) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return libc::EOF;
    };
    let byte = c as u8;
    match h.file().putc(byte) {
        Ok(()) => c_int::from(byte),
        Err(err) => {
            report(&err);
            libc::EOF
        }
    }
}

/// Write a NUL-terminated string without its terminator; returns the byte
/// count, or `EOF`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_puts(stream: *mut RFILE, s: *const c_char) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return libc::EOF;
    };
    if s.is_null() {
        return libc::EOF;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    let bytes = unsafe { std::ffi::CStr::from_ptr(s) }.to_bytes();
    match h.file().write(bytes) {
        Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
        Err(err) => {
            report(&err);
            libc::EOF
        }
    }
}

/// Read a whole file into a `malloc`'d, NUL-terminated buffer.
///
/// Returns 1 and fills `*buf` / `*len` on success. On failure returns 0,
/// sets `*buf = NULL` and `*len = -1`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_read_file(
    path: *const c_char,
    buf: *mut *mut c_void,
    len: *mut i64,
) -> c_int {
    // SAFETY: `buf` and `len` are NULL or valid out-pointers.
    let fail = || unsafe {
        if !buf.is_null() {
            *buf = std::ptr::null_mut();
        }
        if !len.is_null() {
            *len = -1;
        }
        0
    };
    if buf.is_null() {
        return fail();
    }
    // SAFETY: forwarded caller contract on `path`.
    let Some(path) = (unsafe { c_path(path) }) else {
        return fail();
    };
    let contents = match read_file(path) {
        Ok(contents) => contents,
        Err(err) => {
            report(&err);
            return fail();
        }
    };
    let bytes = contents.as_bytes_with_nul();
    // SAFETY: plain allocation; checked for NULL below.
    let out = unsafe { libc::malloc(bytes.len()) }.cast::<u8>();
    if out.is_null() {
        set_errno(libc::ENOMEM);
        return fail();
    }
    // SAFETY: `out` holds `bytes.len()` bytes; `buf`/`len` are valid out-pointers.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len());
        *buf = out.cast();
        if !len.is_null() {
            *len = i64::try_from(contents.len()).unwrap_or(i64::MAX);
        }
    }
    1
}

/// Create or replace `path` with `size` bytes from `data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn filestream_write_file(path: *const c_char, data: *const c_void, size: u64) -> bool {
    // SAFETY: forwarded caller contract on `path`.
    let Some(path) = (unsafe { c_path(path) }) else {
        return false;
    };
    let Ok(size) = usize::try_from(size) else {
        return false;
    };
    let bytes: &[u8] = if size == 0 {
        &[]
    } else if data.is_null() {
        return false;
    } else {
        // SAFETY: caller guarantees `data` is readable for `size` bytes.
        unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size) }
    };
    match write_file(path, bytes) {
        Ok(()) => true,
        Err(err) => {
            report(&err);
            false
        }
    }
}
