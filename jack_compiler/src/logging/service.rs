//! Where events go once they are raised

use super::config;
use super::events::{LogEvent, LogLevel};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Sink for log events
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Filters by level, then hands events to a backend
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    /// Backend and level picked from the `JACK_LOGGING_*` preferences
    pub fn from_preferences() -> Self {
        let logger: Arc<dyn Logger> = match (
            config::use_structured_logging(),
            config::use_console_logging(),
        ) {
            (true, _) => Arc::new(StructuredLogger),
            (false, true) => Arc::new(ConsoleLogger),
            (false, false) => Arc::new(QuietLogger),
        };
        Self::new(logger, config::get_min_log_level())
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: &LogEvent) {
        if self.enabled(event.level) {
            self.logger.log(event);
        }
    }
}

/// Human-readable lines; errors and warnings on stderr
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= LogLevel::Warning {
            eprintln!("{}", event);
        } else {
            println!("{}", event);
        }
    }
}

/// Only errors, on stderr
struct QuietLogger;

impl Logger for QuietLogger {
    fn log(&self, event: &LogEvent) {
        if event.is_error() {
            eprintln!("{}", event);
        }
    }
}

/// One JSON object per line
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        let line = event.to_json().unwrap_or_else(|_| event.to_string());
        if event.is_error() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Keeps the most recent events in memory
pub struct MemoryLogger {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::with_capacity(config::get_error_buffer_size())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_code(&self, code: super::Code) -> bool {
        self.lock().iter().any(|event| event.code == code)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}
