//! Logging bootstrap for the lifecycle core.
//!
//! # Responsibility
//! - Initialize size-rotated file logging exactly once per process.
//! - Capture panics as structured error events before the default hook runs.
//!
//! # Invariants
//! - Initialization is idempotent for an identical configuration.
//! - A second initialization with a different level or directory is
//!   rejected instead of silently rewiring the logger.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "modelbench";
const ROTATE_SIZE_BYTES: u64 = 8 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 4;
const MAX_PANIC_CHARS: usize = 200;

static ACTIVE: OnceCell<ActiveLogging> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogging {
    level: String,
    directory: PathBuf,
    _handle: LoggerHandle,
}

/// Logging configuration for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogSettings {
    level: String,
    directory: PathBuf,
}

impl LogSettings {
    /// Builds settings from a level name and an absolute directory.
    ///
    /// # Errors
    /// - Unsupported level names.
    /// - Empty or relative directories.
    pub fn new(level: &str, directory: impl AsRef<Path>) -> Result<Self, String> {
        let level = normalize_level(level)?;
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err("log directory must not be empty".to_string());
        }
        if !directory.is_absolute() {
            return Err(format!(
                "log directory must be absolute, got `{}`",
                directory.display()
            ));
        }
        Ok(Self {
            level: level.to_string(),
            directory: directory.to_path_buf(),
        })
    }
}

/// Initializes file logging for the process.
///
/// Repeated calls with the same settings succeed; conflicting settings are
/// rejected with a human-readable error.
pub fn init_logging(settings: &LogSettings) -> Result<(), String> {
    if let Some(active) = ACTIVE.get() {
        return check_against_active(active, settings);
    }

    let state = ACTIVE.get_or_try_init(|| -> Result<ActiveLogging, String> {
        std::fs::create_dir_all(&settings.directory).map_err(|err| {
            format!(
                "failed to create log directory `{}`: {err}",
                settings.directory.display()
            )
        })?;

        let handle = Logger::try_with_str(&settings.level)
            .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
            .log_to_file(
                FileSpec::default()
                    .directory(&settings.directory)
                    .basename(LOG_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEPT_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        install_panic_hook();

        info!(
            "event=core_start module=lifecycle status=ok platform={} version={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );

        Ok(ActiveLogging {
            level: settings.level.clone(),
            directory: settings.directory.clone(),
            _handle: handle,
        })
    })?;

    check_against_active(state, settings)
}

/// Returns the active `(level, directory)` pair, when logging is up.
pub fn logging_status() -> Option<(String, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level.clone(), active.directory.clone()))
}

/// Default log level for the current build mode.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn check_against_active(active: &ActiveLogging, settings: &LogSettings) -> Result<(), String> {
    if active.directory != settings.directory {
        return Err(format!(
            "logging already active at `{}`; refusing `{}`",
            active.directory.display(),
            settings.directory.display()
        ));
    }
    if active.level != settings.level {
        return Err(format!(
            "logging already active at level `{}`; refusing `{}`",
            active.level, settings.level
        ));
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic module=lifecycle status=error location={} payload={}",
            location,
            panic_summary(panic_info)
        );
        previous(panic_info);
    }));
}

fn panic_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string payload".to_string()
    };

    let single_line = payload.replace(['\n', '\r'], " ");
    let mut capped: String = single_line.chars().take(MAX_PANIC_CHARS).collect();
    if single_line.chars().count() > MAX_PANIC_CHARS {
        capped.push_str("...");
    }
    capped
}
