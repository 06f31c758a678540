#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use filestream_core::{
    FileBackend, MemoryBackend, OpenMode, RFile, StreamResult, Whence, clear_backend,
    has_registered_backend, init_from_environment, read_file, register_backend, write_file,
};

static TEST_GUARD_HELD: AtomicBool = AtomicBool::new(false);

struct TestGuard;

impl Drop for TestGuard {
    fn drop(&mut self) {
        clear_backend();
        TEST_GUARD_HELD.store(false, Ordering::Release);
    }
}

fn acquire_test_guard() -> TestGuard {
    loop {
        if TEST_GUARD_HELD
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            clear_backend();
            return TestGuard;
        }
        std::thread::yield_now();
    }
}

/// Observable trace of a fixed call sequence.
#[derive(Debug, PartialEq)]
struct Trace {
    writes: Vec<usize>,
    seeks: Vec<u64>,
    tells: Vec<u64>,
    lines: Vec<Option<String>>,
    eofs: Vec<bool>,
    size: u64,
    bytes: Vec<u8>,
    ext: Option<String>,
}

fn exercise(path: &str) -> StreamResult<Trace> {
    let mut f = RFile::open(path, OpenMode::read_write())?;
    let writes = vec![f.write(b"alpha\nbeta\n")?, f.puts("gamma")?];
    let mut seeks = vec![f.seek(0, Whence::Start)?];
    let mut tells = vec![f.tell()?];
    let mut eofs = vec![f.eof()?];
    let lines = vec![f.getline()?, f.getline()?, f.getline()?, f.getline()?];
    eofs.push(f.eof()?);
    seeks.push(f.seek(-5, Whence::End)?);
    tells.push(f.tell()?);
    let mut bytes = vec![0u8; 5];
    f.read_exact_into(&mut bytes)?;
    seeks.push(f.seek(-2, Whence::Current)?);
    let size = f.size()?;
    tells.push(f.tell()?);
    let ext = f.ext().map(str::to_owned);
    f.close()?;
    Ok(Trace {
        writes,
        seeks,
        tells,
        lines,
        eofs,
        size,
        bytes,
        ext,
    })
}

#[test]
fn registered_backend_matches_fallback() {
    let _guard = acquire_test_guard();
    let dir = tempfile::tempdir().unwrap();
    let disk_path = dir.path().join("trace.txt");
    let native = exercise(disk_path.to_str().unwrap()).unwrap();

    let mem = Arc::new(MemoryBackend::new());
    register_backend(mem.clone());
    assert!(has_registered_backend());
    let virt = exercise("virtual/trace.txt").unwrap();

    assert_eq!(native, virt);
    assert_eq!(native.lines[3], None);
    assert_eq!(mem.contents("virtual/trace.txt").unwrap(), b"alpha\nbeta\ngamma");
}

#[test]
fn whole_file_helpers_route_through_backend() {
    let _guard = acquire_test_guard();
    let mem = Arc::new(MemoryBackend::new());
    register_backend(mem.clone());
    write_file("mem/hello.txt", b"hello").unwrap();
    assert_eq!(mem.contents("mem/hello.txt").unwrap(), b"hello");
    let contents = read_file("mem/hello.txt").unwrap();
    assert_eq!(contents.as_bytes_with_nul(), b"hello\0");
    assert_eq!(
        RFile::open("mem/hello.txt", OpenMode::read()).unwrap().strategy(),
        None
    );
}

#[test]
fn environment_without_interface_resets_to_fallback() {
    let _guard = acquire_test_guard();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("real.txt");
    let path = path.to_str().unwrap();

    let mem = Arc::new(MemoryBackend::new());
    let offer = {
        let mem = mem.clone();
        move || -> Option<Arc<dyn FileBackend>> { Some(mem.clone() as Arc<dyn FileBackend>) }
    };
    assert!(init_from_environment(&offer));
    write_file(path, b"virtual").unwrap();
    assert!(mem.contains(path));
    assert!(!std::path::Path::new(path).exists());

    let decline = || -> Option<Arc<dyn FileBackend>> { None };
    assert!(!init_from_environment(&decline));
    assert!(!has_registered_backend());
    write_file(path, b"on disk").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"on disk");
}

#[test]
fn open_handles_keep_their_backend() {
    let _guard = acquire_test_guard();
    let mem = Arc::new(MemoryBackend::new());
    mem.insert("pinned.bin", b"from memory".to_vec());
    register_backend(mem.clone());
    let mut f = RFile::open("pinned.bin", OpenMode::read()).unwrap();
    clear_backend();

    let mut buf = [0u8; 11];
    f.read_exact_into(&mut buf).unwrap();
    assert_eq!(&buf, b"from memory");
    f.close().unwrap();
    assert!(RFile::open("pinned.bin", OpenMode::read()).is_err());
}
