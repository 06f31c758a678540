#![cfg(unix)]

use std::ffi::{CStr, CString, c_void};

use filestream_abi::filestream_abi::*;
use filestream_abi::transforms_abi::*;
use filestream_core::mode::{RFILE_HINT_MMAP, RFILE_MODE_READ, VFS_ACCESS_READ, VFS_ACCESS_WRITE};

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn scratch(dir: &tempfile::TempDir, name: &str) -> CString {
    c(dir.path().join(name).to_str().unwrap())
}

#[test]
fn null_handles_yield_sentinels() {
    let null = std::ptr::null_mut();
    unsafe {
        assert_eq!(filestream_close(null), -1);
        assert_eq!(filestream_tell(null), -1);
        assert_eq!(filestream_seek(null, 0, libc::SEEK_SET), -1);
        assert_eq!(filestream_read(null, std::ptr::null_mut(), 4), -1);
        assert_eq!(filestream_write(null, std::ptr::null(), 4), -1);
        assert_eq!(filestream_flush(null), -1);
        assert_eq!(filestream_get_size(null), -1);
        assert_eq!(filestream_truncate(null, 0), -1);
        assert_eq!(filestream_error(null), -1);
        assert_eq!(filestream_eof(null), -1);
        assert_eq!(filestream_getc(null), libc::EOF);
        assert_eq!(filestream_putc(null, 'x' as i32), libc::EOF);
        assert!(filestream_get_path(null).is_null());
        assert!(filestream_get_ext(null).is_null());
        assert!(filestream_getline(null).is_null());
        filestream_rewind(null);
        assert_eq!(rfclose(null), libc::EOF);
        assert_eq!(rftell(null), -1);
        assert_eq!(rfread(std::ptr::null_mut(), 1, 1, null), 0);
    }
}

#[test]
fn open_write_read_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "cycle.dat");
    unsafe {
        let w = filestream_open(path.as_ptr(), VFS_ACCESS_WRITE, 0);
        assert!(!w.is_null());
        let data = b"0123456789";
        assert_eq!(filestream_write(w, data.as_ptr().cast(), 10), 10);
        assert_eq!(filestream_putc(w, '\n' as i32), '\n' as i32);
        assert_eq!(filestream_close(w), 0);

        let r = filestream_open(path.as_ptr(), VFS_ACCESS_READ, 0);
        assert!(!r.is_null());
        assert_eq!(filestream_get_size(r), 11);
        assert_eq!(filestream_seek(r, -3, libc::SEEK_END), 8);
        assert_eq!(filestream_tell(r), 8);
        assert_eq!(filestream_getc(r), '8' as i32);
        assert_eq!(filestream_eof(r), 0);
        let mut buf = [0u8; 8];
        assert_eq!(filestream_read(r, buf.as_mut_ptr().cast(), 8), 2);
        assert_eq!(filestream_eof(r), 1);
        assert_eq!(filestream_getc(r), libc::EOF);
        assert_eq!(filestream_seek(r, 0, 99), -1);
        filestream_rewind(r);
        assert_eq!(filestream_tell(r), 0);
        assert_eq!(filestream_error(r), 0);
        assert_eq!(filestream_close(r), 0);
    }
}

#[test]
fn path_ext_and_name_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "save.state.srm");
    unsafe {
        let f = filestream_open(path.as_ptr(), VFS_ACCESS_WRITE, 0);
        assert!(!f.is_null());
        assert_eq!(CStr::from_ptr(filestream_get_path(f)), path.as_c_str());
        assert_eq!(CStr::from_ptr(filestream_get_ext(f)).to_str().unwrap(), "srm");
        assert_eq!(
            CStr::from_ptr(filestream_get_name(f)).to_str().unwrap(),
            "save.state.srm"
        );
        assert_eq!(filestream_close(f), 0);
    }
}

#[test]
fn getline_returns_malloced_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "lines.txt");
    std::fs::write(dir.path().join("lines.txt"), b"abc\ndef\n").unwrap();
    unsafe {
        let f = filestream_open_legacy(path.as_ptr(), RFILE_MODE_READ | RFILE_HINT_MMAP);
        assert!(!f.is_null());
        for expected in ["abc", "def"] {
            let line = filestream_getline(f);
            assert!(!line.is_null());
            assert_eq!(CStr::from_ptr(line).to_str().unwrap(), expected);
            libc::free(line.cast());
        }
        assert!(filestream_getline(f).is_null());
        assert_eq!(filestream_close(f), 0);
    }
}

#[test]
fn gets_requires_exact_length() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "fixed.bin");
    std::fs::write(dir.path().join("fixed.bin"), b"abcde").unwrap();
    unsafe {
        let f = filestream_open(path.as_ptr(), VFS_ACCESS_READ, 0);
        let mut buf = [0 as std::ffi::c_char; 4];
        assert_eq!(filestream_gets(f, buf.as_mut_ptr(), 4), buf.as_mut_ptr());
        assert!(filestream_gets(f, buf.as_mut_ptr(), 4).is_null());
        filestream_close(f);
    }
}

#[test]
fn whole_file_exports() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "hello.txt");
    unsafe {
        assert!(filestream_write_file(path.as_ptr(), b"hello".as_ptr().cast(), 5));
        let mut buf: *mut c_void = std::ptr::null_mut();
        let mut len: i64 = 0;
        assert_eq!(filestream_read_file(path.as_ptr(), &mut buf, &mut len), 1);
        assert_eq!(len, 5);
        let bytes = std::slice::from_raw_parts(buf.cast::<u8>(), 6);
        assert_eq!(bytes, b"hello\0");
        libc::free(buf);

        let missing = scratch(&dir, "missing.txt");
        let mut buf: *mut c_void = 1 as *mut c_void;
        assert_eq!(filestream_read_file(missing.as_ptr(), &mut buf, &mut len), 0);
        assert!(buf.is_null());
        assert_eq!(len, -1);
    }
}

#[test]
fn veneer_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "veneer.bin");
    unsafe {
        let f = rfopen(path.as_ptr(), c"w+b".as_ptr());
        assert!(!f.is_null());
        let words: [u32; 3] = [1, 2, 3];
        assert_eq!(rfwrite(words.as_ptr().cast(), 4, 3, f), 3);
        assert_eq!(rfputc('!' as i32, f), '!' as i32);
        assert_eq!(rftell(f), 13);
        assert_eq!(rfseek(f, 0, libc::SEEK_SET), 0);
        let mut back = [0u32; 3];
        assert_eq!(rfread(back.as_mut_ptr().cast(), 4, 3, f), 3);
        assert_eq!(back, words);
        assert_eq!(rfgetc(f), '!' as i32);
        assert_eq!(rfeof(f), 1);
        assert_eq!(rferror(f), 0);
        assert_eq!(rfclose(f), 0);

        let f = rfopen(path.as_ptr(), c"ab".as_ptr());
        assert!(!f.is_null());
        assert_eq!(rftell(f), 13);
        assert_eq!(rfclose(f), 0);

        assert!(rfopen(path.as_ptr(), c"q".as_ptr()).is_null());
        assert!(rfopen(path.as_ptr(), std::ptr::null()).is_null());
    }
}

#[test]
fn rfgets_reads_fixed_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "block.txt");
    std::fs::write(dir.path().join("block.txt"), b"xyz").unwrap();
    unsafe {
        let f = rfopen(path.as_ptr(), c"rb".as_ptr());
        let mut buf = [0 as std::ffi::c_char; 3];
        assert!(!rfgets(buf.as_mut_ptr(), 3, f).is_null());
        assert_eq!(buf.map(|b| b as u8), *b"xyz");
        assert!(rfgets(buf.as_mut_ptr(), 3, f).is_null());
        rfclose(f);
    }
}
