//! # filestream-core
//!
//! Pluggable virtual file streams.
//!
//! Every [`RFile`] operation is resolved either to a backend registered at
//! runtime (see [`dispatch`]) or to the built-in [`fallback`] engine, which
//! serves streams through stdio buffering, raw descriptors, or read-only
//! memory maps depending on the open hints. Higher-level operations (line
//! reading, eof, formatted writes, whole-file helpers) are derived from the
//! primitives and behave the same on either path.
//!
//! Platform calls are confined to the `fallback` module.

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
#[allow(unsafe_code)]
pub mod fallback;
pub mod memory;
pub mod mode;
pub mod stream;
pub mod transforms;
pub mod whole_file;

pub use config::{EngineConfig, engine_config, install_engine_config};
pub use dispatch::{
    BackendFile, FileBackend, HostEnvironment, clear_backend, has_registered_backend,
    init_from_environment, register_backend, registered_backend,
};
pub use error::{StreamError, StreamResult};
pub use fallback::{FallbackBackend, FallbackFile, StrategyKind};
pub use memory::MemoryBackend;
pub use mode::{Access, Hints, OpenMode, Whence};
pub use stream::RFile;
pub use whole_file::{FileContents, read_file, write_file};
