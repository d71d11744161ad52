//! Process-wide logging for the streamer.
//!
//! Colored stdout plus a plain log file, installed once. The directory and
//! level can be moved with `DETECTION_LOG_DIR` and `DETECTION_LOG_LEVEL`.

use crate::error::StreamerError;

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::io::stdout;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339_millis;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

/// Set by the first call to [`initialize`], successful or not.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "detection-streamer.log";

pub const ENV_LOG_DIR: &str = "DETECTION_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "DETECTION_LOG_LEVEL";

const LOG_DIR_NAME: &str = "detection-client";

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// `DETECTION_LOG_DIR` if set, else `<local data dir>/detection-client/logs`
/// (temp dir when the platform has no data dir).
pub fn log_dir() -> PathBuf {
    if let Some(dir) = env::var_os(ENV_LOG_DIR).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join(LOG_DIR_NAME)
        .join("logs")
}

/// Parse a level name (`off`, `error` .. `trace`, any case).
/// Falls back to the build default for a missing or unrecognized value.
pub fn level_from(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Install the global logger (stdout + `log_dir/detection-streamer.log`),
/// creating `log_dir` if needed.
///
/// Later calls log a warning and return `Ok` without touching the installed logger.
///
/// # Errors
///
/// Returns [`StreamerError::Streamer`] if the directory or log file cannot be
/// created, or a global logger is already set by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), StreamerError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let level = level_from(env::var(ENV_LOG_LEVEL).ok().as_deref());
    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir, level).and_then(|dispatch| {
            dispatch.apply().map_err(|e| StreamerError::Streamer {
                message: format!("Failed to install logger: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        });
        if result.is_ok() {
            info!("Logging at {level:?} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
    });

    result
}

/// Console and file outputs under one level filter, not yet installed.
#[track_caller]
pub(crate) fn build_dispatch(
    log_dir: &Path,
    level: LevelFilter,
) -> Result<Dispatch, StreamerError> {
    create_dir_all(log_dir).map_err(|e| StreamerError::Streamer {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&log_file_path).map_err(|e| StreamerError::Streamer {
        message: format!("Failed to open log file {}: {e}", log_file_path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(Dispatch::new()
        .level(level)
        .chain(console_dispatch())
        .chain(file_dispatch().chain(log_file)))
}

/// `12:00:00.123 INFO message`, colored, time of day only.
fn console_dispatch() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    Dispatch::new()
        .format(move |out, message, record| {
            let stamp = format_rfc3339_millis(SystemTime::now()).to_string();
            // "YYYY-MM-DDTHH:MM:SS.mmmZ" -> "HH:MM:SS.mmm"
            let time = stamp.get(11..23).unwrap_or(&stamp).to_string();
            out.finish(format_args!(
                "{time} {level} {message}",
                level = colors.color(record.level()),
            ))
        })
        .chain(stdout())
}

/// Tab-separated: timestamp, level, module, source position, message.
fn file_dispatch() -> Dispatch {
    Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}\t{}\t{}\t{}:{}\t{message}",
            format_rfc3339_millis(SystemTime::now()),
            record.level(),
            record.module_path().unwrap_or(record.target()),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
        ))
    })
}
