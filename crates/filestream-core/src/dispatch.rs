//! Backend traits and the process-wide backend slot.
//!
//! At most one backend is registered per process, normally by the host
//! during initialization. When the slot is empty every open is served by
//! the fallback engine. Each open handle keeps the backend object that
//! created it, so re-registration only affects streams opened afterwards.
//!
//! Registration is expected once, before streams are opened. The slot is
//! still lock-guarded so a late registration cannot tear a concurrent read.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::info;

use crate::config::{EngineConfig, engine_config};
use crate::error::{StreamError, StreamResult};
use crate::fallback::{FallbackBackend, StrategyKind};
use crate::mode::{OpenMode, Whence};

/// A provider of streams.
pub trait FileBackend: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Open `path`. The returned object owns the backend's resource.
    fn open(&self, path: &str, mode: OpenMode) -> StreamResult<Box<dyn BackendFile>>;

    /// Tunables for the derived operations on streams this backend opens.
    fn config(&self) -> EngineConfig {
        *engine_config()
    }
}

/// One open stream inside a backend.
///
/// `seek` returns the resulting absolute offset. `read` and `write` return
/// the count actually transferred, which may be short.
pub trait BackendFile: Send {
    fn path(&self) -> &str;

    fn tell(&mut self) -> StreamResult<u64>;

    fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64>;

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize>;

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize>;

    /// Release the backend resource.
    fn close(self: Box<Self>) -> StreamResult<()>;

    fn flush(&mut self) -> StreamResult<()> {
        Ok(())
    }

    /// Whether a previous operation faulted.
    fn error(&self) -> bool {
        false
    }

    /// Byte length. Backends without a native query seek to the end and
    /// restore the cursor.
    fn size(&mut self) -> StreamResult<u64> {
        size_by_seeking(self)
    }

    fn truncate(&mut self, _len: u64) -> StreamResult<()> {
        Err(StreamError::Unsupported("truncate"))
    }

    /// Fallback strategy backing this stream, if any.
    fn strategy(&self) -> Option<StrategyKind> {
        None
    }
}

/// Size via seek-to-end, restoring the original cursor even on failure.
pub fn size_by_seeking<F: BackendFile + ?Sized>(file: &mut F) -> StreamResult<u64> {
    let here = file.tell()?;
    let origin = i64::try_from(here).map_err(|_| StreamError::InvalidSeek {
        offset: i64::MAX,
        whence: Whence::Start,
    })?;
    let end = file.seek(0, Whence::End);
    file.seek(origin, Whence::Start)?;
    end
}

// ---------------------------------------------------------------------------
// Backend slot
// ---------------------------------------------------------------------------

type Slot = RwLock<Option<Arc<dyn FileBackend>>>;

fn slot() -> &'static Slot {
    static SLOT: OnceLock<Slot> = OnceLock::new();
    SLOT.get_or_init(|| RwLock::new(None))
}

/// Shared fallback engine using the process-wide configuration.
#[must_use]
pub fn fallback_backend() -> &'static FallbackBackend {
    static FALLBACK: OnceLock<FallbackBackend> = OnceLock::new();
    FALLBACK.get_or_init(FallbackBackend::from_global_config)
}

/// Install `backend`; later opens go through it.
pub fn register_backend(backend: Arc<dyn FileBackend>) {
    info!(backend = backend.name(), "file backend registered");
    *slot().write() = Some(backend);
}

/// Empty the slot, returning whatever was registered.
pub fn clear_backend() -> Option<Arc<dyn FileBackend>> {
    let previous = slot().write().take();
    if let Some(backend) = &previous {
        info!(backend = backend.name(), "file backend cleared, using fallback engine");
    }
    previous
}

/// Snapshot of the registered backend.
#[must_use]
pub fn registered_backend() -> Option<Arc<dyn FileBackend>> {
    slot().read().clone()
}

#[must_use]
pub fn has_registered_backend() -> bool {
    slot().read().is_some()
}


// ---------------------------------------------------------------------------
// Host environment
// ---------------------------------------------------------------------------

/// Capability to ask the host for a file interface.
pub trait HostEnvironment {
    /// The host's backend, or `None` if it does not provide one.
    fn vfs_interface(&self) -> Option<Arc<dyn FileBackend>>;
}

impl<F> HostEnvironment for F
where
    F: Fn() -> Option<Arc<dyn FileBackend>>,
{
    fn vfs_interface(&self) -> Option<Arc<dyn FileBackend>> {
        self()
    }
}

/// Query `env` and install its backend, or clear the slot if it declines.
///
/// Returns whether a host backend is now registered.
pub fn init_from_environment(env: &dyn HostEnvironment) -> bool {
    match env.vfs_interface() {
        Some(backend) => {
            register_backend(backend);
            true
        }
        None => {
            clear_backend();
            false
        }
    }
}
