//! Logging for the tutor-chat console client.
//!
//! Chat entries are printed on stdout, so diagnostics never go there. The
//! full log is written to `tutor-chat.log` in the client's data directory;
//! only warnings and errors are echoed on stderr, colored, so they stay
//! readable between chat lines. Transport crates are held at `info` to keep
//! per-frame chatter out of the file.

use crate::error::TutorChatError;

use common::ErrorLocation;

use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Log file name inside the data directory.
pub const LOG_FILE_NAME: &str = "tutor-chat.log";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str =
    "tutor-chat logging already set up, keeping the first log file";

/// File log level for debug builds.
#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// File log level for release builds.
#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Anything below this stays in the file and off the terminal.
const CONSOLE_LEVEL: LevelFilter = LevelFilter::Warn;

/// Module prefixes of the WebSocket and HTTP stacks.
const TRANSPORT_TARGETS: [&str; 5] = [
    "tungstenite",
    "tokio_tungstenite",
    "reqwest",
    "hyper_util",
    "rustls",
];

const TRANSPORT_LEVEL: LevelFilter = LevelFilter::Info;

/// Install the file + stderr logger for the console client.
///
/// Safe to call multiple times: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns an error if:
/// - `tutor-chat.log` cannot be created in `log_dir`
/// - another global logger is already installed
pub fn initialize(log_dir: &Path) -> Result<(), TutorChatError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir).and_then(apply);
        if result.is_ok() {
            info!(
                "tutor-chat logging to {} at level {LOG_LEVEL:?} (terminal: {CONSOLE_LEVEL:?} and above)",
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
    });

    result
}

/// Build the file + stderr dispatch without installing it.
#[track_caller]
pub(crate) fn build_dispatch(log_dir: &Path) -> Result<Dispatch, TutorChatError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let base_dispatch = TRANSPORT_TARGETS
        .iter()
        .fold(Dispatch::new().level(LOG_LEVEL), |dispatch, target| {
            dispatch.level_for(*target, TRANSPORT_LEVEL)
        });

    let console_dispatch = Dispatch::new()
        .level(CONSOLE_LEVEL)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{level}: {message}",
                level = color_configuration.color(record.level()),
                message = message,
            ))
        })
        .chain(stderr());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level} {target}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                target = record.target(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| TutorChatError::TutorChat {
                message: format!(
                    "Failed to create tutor-chat log file {}: {e}",
                    log_file_path.display()
                ),
                location: ErrorLocation::from(Location::caller()),
            })?,
        );

    Ok(base_dispatch.chain(console_dispatch).chain(file_dispatch))
}

#[track_caller]
fn apply(dispatch: Dispatch) -> Result<(), TutorChatError> {
    dispatch.apply().map_err(|e| TutorChatError::TutorChat {
        message: format!("Failed to install the tutor-chat logger: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}
