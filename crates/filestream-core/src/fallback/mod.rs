//! Native fallback engine.
//!
//! Serves every stream when no backend is registered. Each stream is backed
//! by exactly one strategy, chosen at open time from the access mode and
//! hints:
//!
//! ```text
//! mmap hint && read-only  -> Mapped   (unbuffered forced on; degrades to Raw)
//! !unbuffered             -> Buffered (stdio FILE over the descriptor)
//! otherwise               -> Raw      (read/write/lseek on the descriptor)
//! ```

mod buffered;
mod mapped;
pub(crate) mod raw;

use std::ffi::CString;

use tracing::{debug, warn};

use crate::config::{EngineConfig, engine_config};
use crate::dispatch::{BackendFile, FileBackend};
use crate::error::{StreamError, StreamResult};
use crate::mode::{Access, Hints, OpenMode, Whence};

use buffered::BufferedStream;
use mapped::MappedStream;
use raw::RawStream;

/// Which low-level mechanism backs a fallback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Buffered,
    Raw,
    Mapped,
}

#[derive(Debug)]
enum Strategy {
    Buffered(BufferedStream),
    Raw(RawStream),
    Mapped(MappedStream),
}

impl Strategy {
    fn kind(&self) -> StrategyKind {
        match self {
            Self::Buffered(_) => StrategyKind::Buffered,
            Self::Raw(_) => StrategyKind::Raw,
            Self::Mapped(_) => StrategyKind::Mapped,
        }
    }
}

/// Apply the selection policy to the requested hints.
fn effective_hints(mode: &OpenMode, mmap_enabled: bool) -> Hints {
    let mut hints = mode.hints;
    if hints.mmap && mode.access == Access::Read && mmap_enabled {
        hints.unbuffered = true;
    } else {
        hints.mmap = false;
    }
    hints
}

/// The built-in backend.
#[derive(Debug, Clone, Default)]
pub struct FallbackBackend {
    config: EngineConfig,
}

impl FallbackBackend {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_global_config() -> Self {
        Self::new(*engine_config())
    }

    /// Open `path` with a concrete return type.
    pub fn open_file(&self, path: &str, mode: OpenMode) -> StreamResult<FallbackFile> {
        let open_err = |source| StreamError::Open {
            path: path.to_owned(),
            source,
        };
        let c_path = CString::new(path).map_err(|_| StreamError::InvalidPath)?;
        let mut hints = effective_hints(&mode, self.config.mmap_enabled);

        let fd = raw::open_fd(&c_path, mode.oflags()).map_err(open_err)?;

        let strategy = if hints.mmap {
            match MappedStream::map(fd) {
                Ok(mapped) => Strategy::Mapped(mapped),
                Err((fd, err)) => {
                    warn!(path, error = %err, "mmap failed, using raw descriptor");
                    hints.mmap = false;
                    Strategy::Raw(RawStream::new(fd))
                }
            }
        } else if !hints.unbuffered {
            Strategy::Buffered(BufferedStream::from_fd(fd, mode.stdio_mode()).map_err(open_err)?)
        } else {
            Strategy::Raw(RawStream::new(fd))
        };

        let mut file = FallbackFile {
            mode: OpenMode { hints, ..mode },
            path: path.to_owned(),
            size: 0,
            strategy,
            faulted: false,
        };
        file.size = file.strategy_size()?;
        debug!(
            path,
            access = ?mode.access,
            strategy = ?file.strategy.kind(),
            size = file.size,
            "opened fallback stream"
        );
        Ok(file)
    }
}

impl FileBackend for FallbackBackend {
    fn name(&self) -> &str {
        "fallback"
    }

    fn open(&self, path: &str, mode: OpenMode) -> StreamResult<Box<dyn BackendFile>> {
        Ok(Box::new(self.open_file(path, mode)?))
    }

    fn config(&self) -> EngineConfig {
        self.config
    }
}

/// A stream served by the fallback engine.
///
/// Raw and mapped strategies have no native error indicator, so failed
/// primitives set a sticky `faulted` flag that `error` reports.
#[derive(Debug)]
pub struct FallbackFile {
    mode: OpenMode,
    path: String,
    size: u64,
    strategy: Strategy,
    faulted: bool,
}

impl FallbackFile {
    #[must_use]
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Mode with the hints actually in effect.
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Size recorded at open or at the last size query.
    #[must_use]
    pub fn cached_size(&self) -> u64 {
        self.size
    }

    fn strategy_size(&mut self) -> StreamResult<u64> {
        match &mut self.strategy {
            Strategy::Buffered(s) => s.size(),
            Strategy::Raw(s) => s.size(),
            Strategy::Mapped(s) => Ok(s.len()),
        }
    }

    fn track<T>(&mut self, result: StreamResult<T>) -> StreamResult<T> {
        if result.is_err() {
            self.faulted = true;
        }
        result
    }
}

impl BackendFile for FallbackFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn tell(&mut self) -> StreamResult<u64> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.tell(),
            Strategy::Raw(s) => s.tell(),
            Strategy::Mapped(s) => Ok(s.tell()),
        };
        self.track(result)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.seek(offset, whence),
            Strategy::Raw(s) => s.seek(offset, whence),
            Strategy::Mapped(s) => s.seek(offset, whence),
        };
        self.track(result)
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.read(buf),
            Strategy::Raw(s) => s.read(buf),
            Strategy::Mapped(s) => s.read(buf),
        };
        self.track(result)
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.write(buf),
            Strategy::Raw(s) => s.write(buf),
            Strategy::Mapped(_) => Err(StreamError::ReadOnly),
        };
        self.track(result)
    }

    fn flush(&mut self) -> StreamResult<()> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.flush(),
            Strategy::Raw(_) | Strategy::Mapped(_) => Ok(()),
        };
        self.track(result)
    }

    fn error(&self) -> bool {
        match &self.strategy {
            Strategy::Buffered(s) => s.error(),
            Strategy::Raw(_) | Strategy::Mapped(_) => self.faulted,
        }
    }

    fn size(&mut self) -> StreamResult<u64> {
        let result = self.strategy_size();
        let size = self.track(result)?;
        self.size = size;
        Ok(size)
    }

    fn truncate(&mut self, len: u64) -> StreamResult<()> {
        let result = match &mut self.strategy {
            Strategy::Buffered(s) => s.truncate(len),
            Strategy::Raw(s) => s.truncate(len),
            Strategy::Mapped(_) => Err(StreamError::ReadOnly),
        };
        self.track(result)?;
        self.size = len;
        Ok(())
    }

    fn close(self: Box<Self>) -> StreamResult<()> {
        let FallbackFile { path, strategy, .. } = *self;
        let kind = strategy.kind();
        let result = match strategy {
            Strategy::Buffered(s) => s.close(),
            Strategy::Raw(s) => s.close(),
            Strategy::Mapped(s) => s.close(),
        };
        debug!(path = %path, strategy = ?kind, ok = result.is_ok(), "closed fallback stream");
        result
    }

    fn strategy(&self) -> Option<StrategyKind> {
        Some(self.strategy.kind())
    }
}
