//! Engine configuration.
//!
//! The core reads no environment variables. A process-wide configuration
//! starts at [`EngineConfig::default`] and may be replaced once, before the
//! first stream is opened, with [`install_engine_config`]. Front-ends decide
//! where the values come from.

use std::sync::OnceLock;

/// Starting capacity of the `getline` buffer; it doubles on exhaustion.
pub const DEFAULT_GETLINE_CAPACITY: usize = 8;
/// Render ceiling for `printf`.
pub const DEFAULT_PRINTF_LIMIT: usize = 8 * 1024;

/// Tunables shared by the fallback engine and the derived operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub getline_initial_capacity: usize,
    pub printf_limit: usize,
    /// With `false`, the memory-map hint is dropped at open.
    pub mmap_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            getline_initial_capacity: DEFAULT_GETLINE_CAPACITY,
            printf_limit: DEFAULT_PRINTF_LIMIT,
            mmap_enabled: true,
        }
    }
}

static GLOBAL_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Set the process-wide configuration.
///
/// Returns `false` if a configuration was already installed or has already
/// been read, in which case the existing one stays in effect.
pub fn install_engine_config(config: EngineConfig) -> bool {
    GLOBAL_CONFIG.set(config).is_ok()
}

/// Process-wide configuration: the installed one, else the defaults.
#[must_use]
pub fn engine_config() -> &'static EngineConfig {
    GLOBAL_CONFIG.get_or_init(EngineConfig::default)
}
