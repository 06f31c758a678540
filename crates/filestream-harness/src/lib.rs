//! Probe tooling for filestream.
//!
//! Reads a file through every fallback strategy and checks that they agree:
//! same bytes, same size, same line split, and eof only at the end.

#![forbid(unsafe_code)]

pub mod env;
pub mod probe;

pub use env::config_from_env;
pub use probe::{HarnessError, ProbeReport, StrategyProbe, probe_file, strategy_mode};
