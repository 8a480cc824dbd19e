// This file implements the application's logging system.
// It provides macros for the different log levels (INFO, WARN, ERROR, DEBUG),
// writes coloured level tags to stderr, and gates debug output behind a flag
// that the CLI sets once at startup.

use colored::Colorize; // Used for adding color to the level tags.
use std::fmt;
use std::sync::OnceLock; // Ensures the DEBUG_ENABLED flag is initialized exactly once.
use std::sync::atomic::{AtomicBool, Ordering}; // For thread-safe, atomic control of the debug flag.

/// Severity of a log line. Only used by the macros below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

// `log_info!` for general progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => ($crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*)));
}

// `log_warn!` for degraded-but-successful conditions (fallbacks, ignored input).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => ($crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*)));
}

// `log_error!` for failures the user has to act on.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => ($crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*)));
}

// `log_debug!` for detailed internal tracing.
// Messages are only printed if debug mode is enabled via `init(true)`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
            $crate::logger::write($crate::logger::Level::Debug, format_args!($($arg)*));
        }
    };
}

// Global flag to control debug logging, ensured to be initialized once.
static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

/// Initializes the logger, setting the global debug mode.
/// This function should be called once at application startup.
///
/// # Arguments
/// * `debug`: If `true`, enables debug logging; otherwise, only info, warn, and error messages are printed.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug))
        .store(debug, Ordering::Relaxed);

    log_debug!("Logger initialized in DEBUG mode");
}

/// Checks if debug logging is currently enabled.
/// Defaults to `false` if `init` was never called (library use, tests).
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get()
        .map(|f| f.load(Ordering::Relaxed))
        .unwrap_or(false)
}

/// Writes one tagged line to stderr. Called by the `log_*!` macros.
pub fn write(level: Level, message: fmt::Arguments<'_>) {
    let tag = match level {
        Level::Info => "[INFO]".bright_green(),
        Level::Warn => "[WARN]".bright_yellow(),
        Level::Error => "[ERROR]".bright_red(),
        Level::Debug => "[DEBUG]".dimmed(),
    };
    eprintln!("{} {}", tag, message);
}
