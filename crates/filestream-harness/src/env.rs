//! Engine configuration from the harness environment.
//!
//! - `FILESTREAM_MMAP`: `on` (default) or `off`. With `off`, the
//!   memory-map hint is dropped and strategy selection proceeds as if it
//!   had never been given.
//! - `FILESTREAM_PRINTF_LIMIT`: render ceiling for formatted writes, in
//!   bytes (default 8192).

use filestream_core::EngineConfig;

pub const ENV_MMAP: &str = "FILESTREAM_MMAP";
pub const ENV_PRINTF_LIMIT: &str = "FILESTREAM_PRINTF_LIMIT";

/// Parse an on/off switch (case-insensitive).
#[must_use]
pub fn parse_switch(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" | "enabled" => Some(true),
        "off" | "0" | "false" | "no" | "disabled" => Some(false),
        _ => None,
    }
}

/// Build from a key lookup. Unparseable values keep their defaults.
#[must_use]
pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(enabled) = lookup(ENV_MMAP).as_deref().and_then(parse_switch) {
        config.mmap_enabled = enabled;
    }
    if let Some(limit) = lookup(ENV_PRINTF_LIMIT)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
    {
        config.printf_limit = limit;
    }
    config
}

#[must_use]
pub fn config_from_env() -> EngineConfig {
    config_from_lookup(|key| std::env::var(key).ok())
}
