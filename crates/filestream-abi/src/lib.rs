//! # filestream-abi
//!
//! `extern "C"` boundary for filestream.
//!
//! Streams cross the boundary as opaque `RFILE*` handles owned by this
//! crate. Every export maps `StreamError` to the classic C sentinel (`-1`,
//! NULL, `EOF`) and never dereferences a NULL handle.
//!
//! ```text
//! C caller -> export (this crate) -> RFile (filestream-core) -> backend or fallback engine
//! ```

pub mod filestream_abi;
pub mod handle;
pub mod transforms_abi;
pub mod vfs_abi;

pub use handle::RFILE;
