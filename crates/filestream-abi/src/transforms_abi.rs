//! `rf*` exports: stdio-shaped names over `RFILE`.

use std::ffi::{CStr, c_char, c_int, c_long, c_void};

use filestream_core::Whence;
use filestream_core::transforms::{parse_mode_str, rfread as read_elements, rfwrite as write_elements};

use crate::filestream_abi::{
    filestream_close, filestream_eof, filestream_error, filestream_getc, filestream_putc,
    filestream_tell,
};
use crate::handle::{RFILE, c_path, handle, into_raw, report, set_errno};

/// `fopen`-style open: `r`, `r+`, `w`, `w+`, `a`, `a+`, each optionally with `b`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfopen(path: *const c_char, mode: *const c_char) -> *mut RFILE {
    if mode.is_null() {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    let mode = unsafe { CStr::from_ptr(mode) }.to_str().unwrap_or("");
    // SAFETY: forwarded caller contract on `path`.
    let Some(path) = (unsafe { c_path(path) }) else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };
    if parse_mode_str(mode).is_none() {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    }
    match filestream_core::transforms::rfopen(path, mode) {
        Ok(file) => into_raw(file),
        Err(err) => {
            report(&err);
            std::ptr::null_mut()
        }
    }
}

/// Returns 0, or `EOF` on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfclose(stream: *mut RFILE) -> c_int {
    // SAFETY: forwarded caller contract.
    match unsafe { filestream_close(stream) } {
        0 => 0,
        _ => libc::EOF,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rftell(stream: *mut RFILE) -> c_long {
    // SAFETY: forwarded caller contract.
    let pos = unsafe { filestream_tell(stream) };
    c_long::try_from(pos).unwrap_or(-1)
}

/// `fseek` shape: 0 on success, -1 on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfseek(stream: *mut RFILE, offset: c_long, origin: c_int) -> c_int {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return -1;
    };
    let Some(whence) = Whence::from_raw(origin) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    match filestream_core::transforms::rfseek(h.file(), i64::from(offset), whence) {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            -1
        }
    }
}

/// Returns the number of whole elements read.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfread(
    buffer: *mut c_void,
    element_size: usize,
    element_count: usize,
    stream: *mut RFILE,
) -> usize {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return 0;
    };
    let Some(total) = element_size.checked_mul(element_count) else {
        return 0;
    };
    if buffer.is_null() || total == 0 {
        return 0;
    }
    // SAFETY: caller guarantees `buffer` is writable for `total` bytes.
    let buf = unsafe { std::slice::from_raw_parts_mut(buffer.cast::<u8>(), total) };
    elements_or_zero(read_elements(h.file(), buf, element_size, element_count))
}

/// Returns the number of whole elements written.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfwrite(
    buffer: *const c_void,
    element_size: usize,
    element_count: usize,
    stream: *mut RFILE,
) -> usize {
    // SAFETY: caller passes a live handle or NULL.
    let Some(h) = (unsafe { handle(stream) }) else {
        return 0;
    };
    let Some(total) = element_size.checked_mul(element_count) else {
        return 0;
    };
    if buffer.is_null() || total == 0 {
        return 0;
    }
    // SAFETY: caller guarantees `buffer` is readable for `total` bytes.
    let buf = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), total) };
    elements_or_zero(write_elements(h.file(), buf, element_size, element_count))
}

fn elements_or_zero(result: filestream_core::StreamResult<usize>) -> usize {
    result.unwrap_or_else(|err| {
        report(&err);
        0
    })
}

/// Fixed-length read of `max_count` bytes into `buffer`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfgets(buffer: *mut c_char, max_count: c_int, stream: *mut RFILE) -> *mut c_char {
    let Ok(len) = usize::try_from(max_count) else {
        return std::ptr::null_mut();
    };
    // SAFETY: forwarded caller contract.
    unsafe { crate::filestream_abi::filestream_gets(stream, buffer, len as u64) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfgetc(stream: *mut RFILE) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { filestream_getc(stream) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfputc(character: c_int, stream: *mut RFILE) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { filestream_putc(stream, character) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rferror(stream: *mut RFILE) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { filestream_error(stream) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfeof(stream: *mut RFILE) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { filestream_eof(stream) }
}
