//! Logging knobs: buffer sizes fixed at build time, output chosen at run time

use super::events::LogLevel;
use crate::config::compile_time::logging::{MAX_ERROR_COLLECTION, MAX_LOG_EVENTS_PER_FILE};
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

static PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Override the environment-derived preferences; only the first call takes effect
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    PREFERENCES
        .set(preferences)
        .map_err(|_| "logging preferences already set".to_string())
}

fn preferences() -> &'static LoggingPreferences {
    PREFERENCES.get_or_init(LoggingPreferences::default)
}

pub fn get_min_log_level() -> LogLevel {
    preferences().min_log_level
}

pub fn use_structured_logging() -> bool {
    preferences().use_structured_logging
}

pub fn use_console_logging() -> bool {
    preferences().enable_console_logging
}

pub fn use_cargo_style_output() -> bool {
    preferences().enable_cargo_style_output
}

pub fn get_error_buffer_size() -> usize {
    MAX_ERROR_COLLECTION
}

pub fn get_max_log_events_per_file() -> usize {
    MAX_LOG_EVENTS_PER_FILE
}

pub fn validate_config() -> Result<(), String> {
    match (MAX_ERROR_COLLECTION, MAX_LOG_EVENTS_PER_FILE) {
        (0, _) => Err("max_error_collection must be positive".to_string()),
        (_, 0) => Err("max_log_events_per_file must be positive".to_string()),
        _ => Ok(()),
    }
}
