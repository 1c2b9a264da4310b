//! Logging setup.
//!
//! The study screen owns the terminal, so while it runs logs go to a file;
//! the one-shot subcommands log to stderr. `RUST_LOG` overrides the level
//! chosen on the command line.

use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Maps `-q` and the number of `-v` flags to a level.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    pub fn to_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    let default_filter = format!("tickets_tui={}", verbosity.to_level());
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Logs to stderr. Safe to call more than once; later calls are ignored.
pub fn init_logging(verbosity: Verbosity) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .try_init();
}

/// Logs to `path`, appending. Used while the terminal UI is on screen.
pub fn init_file_logging(verbosity: Verbosity, path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();
    Ok(())
}
