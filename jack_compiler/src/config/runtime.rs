//! Preferences that may change between runs without rebuilding
//!
//! Each group reads `JACK_*` environment variables in its `Default`, falling
//! back to the compile-time limits. A whole [`RuntimeConfig`] can also be
//! loaded from a TOML file, with any missing key taking its default.

use super::compile_time::batch_processing::MAX_WORKER_THREADS;
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Environment variable names
pub mod env_vars {
    pub const REQUIRE_JACK_EXTENSION: &str = "JACK_REQUIRE_JACK_EXTENSION";
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "JACK_ENABLE_PERFORMANCE_LOGGING";
    pub const LEXICAL_DETAILED_METRICS: &str = "JACK_LEXICAL_DETAILED_METRICS";
    pub const BATCH_MAX_THREADS: &str = "JACK_BATCH_MAX_THREADS";
    pub const BATCH_FAIL_FAST: &str = "JACK_BATCH_FAIL_FAST";
    pub const BATCH_PROGRESS: &str = "JACK_BATCH_PROGRESS";
    pub const LOGGING_USE_STRUCTURED: &str = "JACK_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "JACK_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "JACK_LOGGING_MIN_LEVEL";
    pub const LOGGING_CARGO_STYLE: &str = "JACK_LOGGING_CARGO_STYLE";
}

/// Unset or unparsable variables yield `fallback`
fn env_or<T: FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProcessorPreferences {
    /// Reject inputs whose extension is not `.jack`
    pub require_jack_extension: bool,
    /// Log read timings for each file
    pub enable_performance_logging: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            require_jack_extension: env_or(env_vars::REQUIRE_JACK_EXTENSION, true),
            enable_performance_logging: env_or(env_vars::ENABLE_PERFORMANCE_LOGGING, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalPreferences {
    /// Count tokens per kind, not just in total
    pub collect_detailed_metrics: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            collect_detailed_metrics: env_or(env_vars::LEXICAL_DETAILED_METRICS, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPreferences {
    /// Clamped to `1..=MAX_WORKER_THREADS`
    pub max_threads: usize,
    pub fail_fast: bool,
    pub progress_reporting: bool,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            max_threads: env_or(env_vars::BATCH_MAX_THREADS, MAX_WORKER_THREADS)
                .clamp(1, MAX_WORKER_THREADS),
            fail_fast: env_or(env_vars::BATCH_FAIL_FAST, false),
            progress_reporting: env_or(env_vars::BATCH_PROGRESS, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// JSON lines instead of plain text
    pub use_structured_logging: bool,
    /// Print info and warnings, not only errors
    pub enable_console_logging: bool,
    pub min_log_level: LogLevel,
    /// Per-file diagnostics summary at the end of a run
    pub enable_cargo_style_output: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env_or(env_vars::LOGGING_USE_STRUCTURED, false),
            enable_console_logging: env_or(env_vars::LOGGING_ENABLE_CONSOLE, false),
            min_log_level: env_or(env_vars::LOGGING_MIN_LEVEL, LogLevel::Info),
            enable_cargo_style_output: env_or(env_vars::LOGGING_CARGO_STYLE, true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub lexical: LexicalPreferences,
    pub batch: BatchPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let mut config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.batch.max_threads = config.batch.max_threads.clamp(1, MAX_WORKER_THREADS);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        Self::from_toml_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }
}
