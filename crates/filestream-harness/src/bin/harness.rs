//! CLI entrypoint for the filestream harness.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

use filestream_core::{FallbackBackend, RFile, StrategyKind, install_engine_config};
use filestream_harness::{HarnessError, config_from_env, probe_file, strategy_mode};

/// Stream probing tooling for filestream.
#[derive(Debug, Parser)]
#[command(name = "filestream-harness")]
#[command(about = "Exercise filestream strategies against real files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Buffered,
    Raw,
    Mmap,
}

impl From<Strategy> for StrategyKind {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Buffered => StrategyKind::Buffered,
            Strategy::Raw => StrategyKind::Raw,
            Strategy::Mmap => StrategyKind::Mapped,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read a file through every strategy and report whether they agree.
    Probe {
        #[arg(long)]
        path: PathBuf,
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Copy a file to stdout through one strategy.
    Cat {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, value_enum, default_value = "buffered")]
        strategy: Strategy,
    },
    /// Print each line of a file, numbered, through one strategy.
    Lines {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, value_enum, default_value = "buffered")]
        strategy: Strategy,
    },
}

fn path_str(path: &std::path::Path) -> Result<&str, HarnessError> {
    path.to_str().ok_or(HarnessError::NonUtf8Path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_from_env();
    install_engine_config(config);
    let engine = FallbackBackend::new(config);

    match cli.command {
        Command::Probe { path, output } => {
            let report = probe_file(&engine, path_str(&path)?)?;
            let json = report.to_json()?;
            match output {
                Some(out) => std::fs::write(&out, json + "\n")?,
                None => println!("{json}"),
            }
            if !report.consistent {
                return Err(format!("strategies disagree on {}", path.display()).into());
            }
        }
        Command::Cat { path, strategy } => {
            let mode = strategy_mode(strategy.into());
            let mut file = RFile::open_with(&engine, path_str(&path)?, mode)?;
            let mut stdout = std::io::stdout().lock();
            std::io::copy(&mut file, &mut stdout)?;
            stdout.flush()?;
            file.close()?;
        }
        Command::Lines { path, strategy } => {
            let mode = strategy_mode(strategy.into());
            let mut file = RFile::open_with(&engine, path_str(&path)?, mode)?;
            let mut stdout = std::io::stdout().lock();
            let mut n = 0usize;
            while let Some(line) = file.getline()? {
                n += 1;
                writeln!(stdout, "{n:>6}  {line}")?;
            }
            file.close()?;
        }
    }
    Ok(())
}
