//! Process-wide file logging.
//!
//! Everything in the crate logs through the `log` facade with
//! `event=<name> key=value` messages. This module only installs the sink:
//! a size-rotated file logger under the workspace `logs/` directory.
//! Initialization happens at most once per process; repeating it with the
//! same level and directory is a no-op, anything else is rejected.

use crate::infrastructure::error::PersistenceError;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "dayblock";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: PathBuf,
    _logger: LoggerHandle,
}

pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), PersistenceError> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.to_path_buf();

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, PersistenceError> {
        std::fs::create_dir_all(&log_dir)?;
        let logger = Logger::try_with_str(level)
            .map_err(|error| {
                PersistenceError::InvalidConfig(format!("log level {level}: {error}"))
            })?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir.as_path())
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|error| {
                PersistenceError::InvalidConfig(format!("failed to start logger: {error}"))
            })?;

        log::info!(
            "event=logging_init level={level} log_dir={} version={}",
            log_dir.display(),
            env!("CARGO_PKG_VERSION")
        );
        Ok(LoggingState {
            level,
            log_dir: log_dir.clone(),
            _logger: logger,
        })
    })?;

    if state.log_dir != log_dir {
        return Err(PersistenceError::InvalidConfig(format!(
            "logging already initialized at {}; refusing to switch to {}",
            state.log_dir.display(),
            log_dir.display()
        )));
    }
    if state.level != level {
        return Err(PersistenceError::InvalidConfig(format!(
            "logging already initialized with level {}; refusing to switch to {level}",
            state.level
        )));
    }
    Ok(())
}

pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

fn normalize_level(level: &str) -> Result<&'static str, PersistenceError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(PersistenceError::InvalidConfig(format!(
            "unsupported log level {other}; expected trace|debug|info|warn|error"
        ))),
    }
}
