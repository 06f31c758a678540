//! Whole-file helpers built on `RFile`.

use tracing::debug;

use crate::error::{StreamError, StreamResult};
use crate::mode::{OpenMode, Whence};
use crate::stream::RFile;

/// Contents of a file read in one go, NUL-terminated after `len` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    buf: Vec<u8>,
    len: usize,
}

impl FileContents {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The bytes followed by the terminating NUL.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes without the terminator.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

/// Read all of `path`.
pub fn read_file(path: &str) -> StreamResult<FileContents> {
    let mut file = RFile::open(path, OpenMode::read()).inspect_err(|err| {
        debug!(path, error = %err, "read_file: open failed");
    })?;
    match read_open_file(&mut file) {
        Ok(contents) => {
            file.close()?;
            Ok(contents)
        }
        Err(err) => {
            debug!(path, error = %err, "read_file failed");
            let _ = file.close();
            Err(err)
        }
    }
}

fn read_open_file(file: &mut RFile) -> StreamResult<FileContents> {
    let size = file.seek(0, Whence::End)?;
    file.seek(0, Whence::Start)?;
    let size = usize::try_from(size).map_err(|_| StreamError::OutOfMemory)?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(size + 1)
        .map_err(|_| StreamError::OutOfMemory)?;
    buf.resize(size, 0);

    let mut len = 0;
    while len < size {
        match file.read(&mut buf[len..])? {
            0 => break,
            n => len += n,
        }
    }
    buf.truncate(len);
    buf.push(0);
    Ok(FileContents { buf, len })
}

/// Create or replace `path` with `data`.
///
/// Succeeds only if every byte was written and the close succeeded.
pub fn write_file(path: &str, data: &[u8]) -> StreamResult<()> {
    let mut file = RFile::open(path, OpenMode::write()).inspect_err(|err| {
        debug!(path, error = %err, "write_file: open failed");
    })?;
    let written = file.write(data);
    let closed = file.close();
    let written = written?;
    closed?;
    if written != data.len() {
        debug!(path, expected = data.len(), written, "write_file: short write");
        return Err(StreamError::ShortWrite {
            expected: data.len(),
            actual: written,
        });
    }
    Ok(())
}
