#![cfg(unix)]

use std::path::PathBuf;

use filestream_core::{
    EngineConfig, FallbackBackend, OpenMode, RFile, StrategyKind, StreamError, Whence, read_file,
    rfprintf, write_file,
};

fn scratch_path(dir: &tempfile::TempDir, name: &str) -> String {
    let path: PathBuf = dir.path().join(name);
    path.to_str().unwrap().to_owned()
}

fn pattern(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i * 31 % 251) as u8).collect()
}

fn read_all(file: &mut RFile, n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n];
    file.read_exact_into(&mut out).unwrap();
    let mut extra = [0u8; 1];
    assert_eq!(file.read(&mut extra).unwrap(), 0);
    out
}

fn roundtrip_descriptor(mode: OpenMode, expected: StrategyKind) {
    let dir = tempfile::tempdir().unwrap();
    for n in [0usize, 1, 4096, 1 << 20] {
        let path = scratch_path(&dir, &format!("rt_{n}.bin"));
        let data = pattern(n);
        let mut file = RFile::open(&path, mode).unwrap();
        assert_eq!(file.strategy(), Some(expected));
        let mut written = 0;
        while written < n {
            written += file.write(&data[written..]).unwrap();
        }
        file.flush().unwrap();
        assert_eq!(file.size().unwrap(), n as u64);
        file.rewind();
        assert_eq!(file.tell().unwrap(), 0);
        assert_eq!(read_all(&mut file, n), data, "n={n}");
        file.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }
}

#[test]
fn buffered_roundtrip() {
    roundtrip_descriptor(OpenMode::read_write(), StrategyKind::Buffered);
}

#[test]
fn raw_roundtrip() {
    roundtrip_descriptor(OpenMode::read_write().unbuffered(), StrategyKind::Raw);
}

#[test]
fn mapped_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    for n in [0usize, 1, 4096, 1 << 20] {
        let path = scratch_path(&dir, &format!("map_{n}.bin"));
        let data = pattern(n);
        std::fs::write(&path, &data).unwrap();
        let mut file = RFile::open(&path, OpenMode::read().mmap()).unwrap();
        let expected = if n == 0 {
            StrategyKind::Raw
        } else {
            StrategyKind::Mapped
        };
        assert_eq!(file.strategy(), Some(expected), "n={n}");
        assert_eq!(file.size().unwrap(), n as u64);
        assert_eq!(read_all(&mut file, n), data, "n={n}");
        file.close().unwrap();
    }
}

#[test]
fn mmap_hint_ignored_for_writable_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "rw.bin");
    let file = RFile::open(&path, OpenMode::read_write().mmap()).unwrap();
    assert_eq!(file.strategy(), Some(StrategyKind::Buffered));
    file.close().unwrap();
}

#[test]
fn legacy_bits_select_strategy() {
    use filestream_core::mode::{RFILE_HINT_MMAP, RFILE_HINT_UNBUFFERED, RFILE_MODE_READ};
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "legacy.bin");
    std::fs::write(&path, b"legacy").unwrap();

    let f = RFile::open_legacy(&path, RFILE_MODE_READ).unwrap();
    assert_eq!(f.strategy(), Some(StrategyKind::Buffered));
    let f2 = RFile::open_legacy(&path, RFILE_MODE_READ | RFILE_HINT_UNBUFFERED).unwrap();
    assert_eq!(f2.strategy(), Some(StrategyKind::Raw));
    let f3 = RFile::open_legacy(&path, RFILE_MODE_READ | RFILE_HINT_MMAP).unwrap();
    assert_eq!(f3.strategy(), Some(StrategyKind::Mapped));
    assert!(matches!(
        RFile::open_legacy(&path, 0x7f),
        Err(StreamError::Unsupported(_))
    ));
}

#[test]
fn eof_tracks_cursor_without_moving_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "eof.txt");
    std::fs::write(&path, b"0123456789").unwrap();
    for mode in [
        OpenMode::read(),
        OpenMode::read().unbuffered(),
        OpenMode::read().mmap(),
    ] {
        let mut file = RFile::open(&path, mode).unwrap();
        assert!(!file.eof().unwrap());
        file.seek(4, Whence::Start).unwrap();
        assert!(!file.eof().unwrap());
        assert_eq!(file.tell().unwrap(), 4);
        assert_eq!(file.seek(0, Whence::End).unwrap(), 10);
        assert!(file.eof().unwrap());
        file.rewind();
        assert!(!file.eof().unwrap());
        assert_eq!(file.tell().unwrap(), 0);
    }
}

#[test]
fn eof_on_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "empty");
    std::fs::write(&path, b"").unwrap();
    let mut file = RFile::open(&path, OpenMode::read()).unwrap();
    assert!(file.eof().unwrap());
}

#[test]
fn getline_splits_and_strips_newlines() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "lines.txt");
    std::fs::write(&path, b"abc\ndef\n").unwrap();
    let mut file = RFile::open(&path, OpenMode::read().text()).unwrap();
    assert_eq!(file.getline().unwrap().as_deref(), Some("abc"));
    assert_eq!(file.getline().unwrap().as_deref(), Some("def"));
    assert_eq!(file.getline().unwrap(), None);
}

#[test]
fn getline_grows_for_long_unterminated_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "long.txt");
    let line = "x".repeat(100);
    std::fs::write(&path, &line).unwrap();
    let mut file = RFile::open(&path, OpenMode::read().unbuffered()).unwrap();
    assert_eq!(file.getline().unwrap(), Some(line));
    assert_eq!(file.getline().unwrap(), None);
}

#[test]
fn getline_keeps_empty_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "blank.txt");
    std::fs::write(&path, b"\n\nz").unwrap();
    let mut file = RFile::open(&path, OpenMode::read().mmap()).unwrap();
    assert_eq!(file.getline().unwrap().as_deref(), Some(""));
    assert_eq!(file.getline().unwrap().as_deref(), Some(""));
    assert_eq!(file.getline().unwrap().as_deref(), Some("z"));
    assert_eq!(file.getline().unwrap(), None);
}

#[test]
fn mapped_read_clamps_and_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "ten.bin");
    std::fs::write(&path, b"0123456789").unwrap();
    let mut file = RFile::open(&path, OpenMode::read().mmap()).unwrap();
    assert_eq!(file.seek(8, Whence::Start).unwrap(), 8);
    let mut buf = [0u8; 10];
    assert_eq!(file.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"89");

    assert!(!file.error());
    assert!(matches!(file.write(b"no"), Err(StreamError::ReadOnly)));
    assert!(file.error());
    file.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
}

#[test]
fn byte_io_and_fixed_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "bytes.bin");
    let mut file = RFile::open(&path, OpenMode::write()).unwrap();
    for b in b"hey!" {
        file.putc(*b).unwrap();
    }
    assert_eq!(file.puts(" there").unwrap(), 6);
    file.close().unwrap();

    let mut file = RFile::open(&path, OpenMode::read()).unwrap();
    assert_eq!(file.getc().unwrap(), Some(b'h'));
    let mut three = [0u8; 3];
    file.gets(&mut three).unwrap();
    assert_eq!(&three, b"ey!");
    let mut too_many = [0u8; 16];
    assert!(matches!(
        file.gets(&mut too_many),
        Err(StreamError::ShortRead {
            expected: 16,
            actual: 6
        })
    ));
    assert_eq!(file.getc().unwrap(), None);
}

#[test]
fn printf_renders_and_writes_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "fmt.txt");
    let mut file = RFile::open(&path, OpenMode::write()).unwrap();
    assert_eq!(rfprintf!(&mut file, "{}={:04}\n", "level", 7).unwrap(), 11);
    assert_eq!(rfprintf!(&mut file, "{}", "").unwrap(), 0);
    let huge = "y".repeat(64 * 1024);
    assert!(matches!(
        rfprintf!(&mut file, "{huge}"),
        Err(StreamError::FormatOverflow { .. })
    ));
    file.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"level=0007\n");
}

#[test]
fn render_limit_follows_opening_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "small.txt");
    let engine = FallbackBackend::new(EngineConfig {
        printf_limit: 4,
        getline_initial_capacity: 1,
        ..EngineConfig::default()
    });
    let mut file = RFile::open_with(&engine, &path, OpenMode::read_write()).unwrap();
    assert_eq!(file.config().printf_limit, 4);
    assert!(matches!(
        rfprintf!(&mut file, "{}", "hello"),
        Err(StreamError::FormatOverflow { limit: 4 })
    ));
    assert_eq!(rfprintf!(&mut file, "ab\n").unwrap(), 3);
    assert_eq!(rfprintf!(&mut file, "long").unwrap(), 4);
    file.rewind();
    assert_eq!(file.getline().unwrap().as_deref(), Some("ab"));
    assert_eq!(file.getline().unwrap().as_deref(), Some("long"));
    file.close().unwrap();
}

#[test]
fn faulted_stream_stays_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "fault.bin");
    std::fs::write(&path, b"0123").unwrap();
    let mut file = RFile::open(&path, OpenMode::read().unbuffered()).unwrap();
    assert!(file.write(b"x").is_err());
    assert!(file.error());
    let mut buf = [0u8; 4];
    file.gets(&mut buf).unwrap();
    assert_eq!(&buf, b"0123");
    assert!(file.eof().unwrap());
    file.close().unwrap();
}

#[test]
fn legacy_read_write_keeps_contents() {
    use filestream_core::mode::RFILE_MODE_READ_WRITE;
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "legacy_rw.bin");
    std::fs::write(&path, b"abcdef").unwrap();

    let mut file = RFile::open_legacy(&path, RFILE_MODE_READ_WRITE).unwrap();
    assert_eq!(file.size().unwrap(), 6);
    file.write(b"XY").unwrap();
    file.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"XYcdef");
}

#[test]
fn path_queries() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("saves.d");
    std::fs::create_dir(&sub).unwrap();
    let path = sub.join("slot1.srm");
    let path = path.to_str().unwrap();
    let file = RFile::open(path, OpenMode::write()).unwrap();
    assert_eq!(file.path(), path);
    assert_eq!(file.ext(), Some("srm"));
    assert_eq!(file.name(), "slot1.srm");
    file.close().unwrap();

    let bare = sub.join("README");
    let file = RFile::open(bare.to_str().unwrap(), OpenMode::write()).unwrap();
    assert_eq!(file.ext(), None);
}

#[test]
fn truncate_shrinks_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "trunc.bin");
    std::fs::write(&path, b"abcdefgh").unwrap();
    let mut file = RFile::open(&path, OpenMode::read_write()).unwrap();
    file.truncate(3).unwrap();
    assert_eq!(file.size().unwrap(), 3);
    file.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"abc");
}

#[test]
fn read_write_preserves_existing_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "keep.bin");
    std::fs::write(&path, b"abcdef").unwrap();
    let mut file = RFile::open(&path, OpenMode::read_write().unbuffered()).unwrap();
    file.seek(2, Whence::Start).unwrap();
    file.write(b"XY").unwrap();
    file.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"abXYef");
}

#[test]
fn open_missing_for_read_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "missing");
    for mode in [OpenMode::read(), OpenMode::read().unbuffered(), OpenMode::read().mmap()] {
        let err = RFile::open(&path, mode).unwrap_err();
        assert!(matches!(err, StreamError::Open { .. }));
    }
}

#[test]
fn whole_file_helpers() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "hello.txt");
    write_file(&path, b"hello").unwrap();
    let contents = read_file(&path).unwrap();
    assert_eq!(contents.len(), 5);
    assert_eq!(contents.as_bytes(), b"hello");
    assert_eq!(contents.as_bytes_with_nul()[5], 0);

    write_file(&path, b"").unwrap();
    let contents = read_file(&path).unwrap();
    assert!(contents.is_empty());
    assert_eq!(contents.as_bytes_with_nul(), b"\0");

    assert!(read_file(&scratch_path(&dir, "nope")).is_err());
}

#[test]
fn std_io_traits() {
    use std::io::{Read, Seek, SeekFrom, Write};
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_path(&dir, "io.txt");
    let mut file = RFile::open(&path, OpenMode::read_write()).unwrap();
    writeln!(file, "line {}", 1).unwrap();
    Seek::seek(&mut file, SeekFrom::Start(0)).unwrap();
    let mut s = String::new();
    file.read_to_string(&mut s).unwrap();
    assert_eq!(s, "line 1\n");
}
