//! Cross-strategy consistency probe.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use filestream_core::{FallbackBackend, OpenMode, RFile, StrategyKind, StreamError};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("stream: {0}")]
    Stream(#[from] StreamError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path is not valid UTF-8")]
    NonUtf8Path,
}

/// Open mode that asks the fallback engine for `kind`.
#[must_use]
pub fn strategy_mode(kind: StrategyKind) -> OpenMode {
    match kind {
        StrategyKind::Buffered => OpenMode::read(),
        StrategyKind::Raw => OpenMode::read().unbuffered(),
        StrategyKind::Mapped => OpenMode::read().mmap(),
    }
}

/// What one strategy observed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StrategyProbe {
    pub requested: String,
    /// Strategy the engine actually chose (mapped degrades to raw for
    /// empty files).
    pub selected: String,
    pub size: u64,
    pub bytes_read: u64,
    pub sha256: String,
    pub lines: usize,
    pub eof_at_start: bool,
    pub eof_at_end: bool,
    pub error_flag: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub path: String,
    pub strategies: Vec<StrategyProbe>,
    /// True when every strategy saw identical content and sizes.
    pub consistent: bool,
}

impl ProbeReport {
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn kind_name(kind: Option<StrategyKind>) -> String {
    match kind {
        Some(kind) => format!("{kind:?}").to_lowercase(),
        None => "backend".to_owned(),
    }
}

fn probe_one(engine: &FallbackBackend, path: &str, kind: StrategyKind) -> Result<StrategyProbe, HarnessError> {
    let mut file = RFile::open_with(engine, path, strategy_mode(kind))?;
    let selected = kind_name(file.strategy());
    let size = file.size()?;
    let eof_at_start = file.eof()?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut bytes_read = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes_read += n as u64;
    }
    let eof_at_end = file.eof()?;

    file.rewind();
    let mut lines = 0;
    while file.getline_bytes()?.is_some() {
        lines += 1;
    }
    let error_flag = file.error();
    file.close()?;

    debug!(path, requested = ?kind, selected = %selected, size, bytes_read, "strategy probed");
    Ok(StrategyProbe {
        requested: kind_name(Some(kind)),
        selected,
        size,
        bytes_read,
        sha256: hex_lower(&hasher.finalize()),
        lines,
        eof_at_start,
        eof_at_end,
        error_flag,
    })
}

/// Probe `path` through the buffered, raw and mapped strategies.
pub fn probe_file(engine: &FallbackBackend, path: &str) -> Result<ProbeReport, HarnessError> {
    let strategies = [StrategyKind::Buffered, StrategyKind::Raw, StrategyKind::Mapped]
        .into_iter()
        .map(|kind| probe_one(engine, path, kind))
        .collect::<Result<Vec<_>, _>>()?;

    let consistent = strategies.windows(2).all(|w| {
        w[0].sha256 == w[1].sha256
            && w[0].size == w[1].size
            && w[0].bytes_read == w[1].bytes_read
            && w[0].lines == w[1].lines
    }) && strategies
        .iter()
        .all(|s| s.eof_at_end && !s.error_flag && s.bytes_read == s.size);

    info!(path, consistent, "probe finished");
    Ok(ProbeReport {
        path: path.to_owned(),
        strategies,
        consistent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding() {
        assert_eq!(hex_lower(&[0x00, 0xab, 0x10]), "00ab10");
    }

    #[test]
    fn modes_request_each_strategy() {
        assert!(strategy_mode(StrategyKind::Mapped).hints.mmap);
        assert!(strategy_mode(StrategyKind::Raw).hints.unbuffered);
        assert!(!strategy_mode(StrategyKind::Buffered).hints.unbuffered);
    }
}
