//! Process-wide diagnostics for the toolchain
//!
//! Events go to one global [`LoggingService`]. Warnings and errors raised
//! while a thread has a file context are also kept by the global
//! [`ErrorCollector`], so a parallel directory build can report them per file
//! once it finishes.

pub mod codes;
pub mod collector;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use crate::utils::Span;
use std::cell::RefCell;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use collector::{ErrorCollector, FileContext, RunSummary};
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

/// `"key" => value` pairs as the macros pass them
pub type Context<'a> = [(&'a str, &'a dyn Display)];

static SERVICE: OnceLock<Arc<LoggingService>> = OnceLock::new();
static COLLECTOR: OnceLock<ErrorCollector> = OnceLock::new();

thread_local! {
    static CURRENT_FILE: RefCell<Option<FileContext>> = const { RefCell::new(None) };
}

pub fn init_global_logging() -> Result<(), String> {
    config::validate_config()?;
    init_global_logging_with_service(Arc::new(LoggingService::from_preferences()))?;
    log_success_with_context(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Logging initialized",
        &[],
    );
    Ok(())
}

/// Install a specific service, e.g. one backed by a [`MemoryLogger`]
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    SERVICE
        .set(service)
        .map_err(|_| "global logger already initialized".to_string())
}

fn collector() -> &'static ErrorCollector {
    COLLECTOR.get_or_init(ErrorCollector::new)
}

/// Run `f` with `file_path` as this thread's current file
pub fn with_file_context<F, R>(file_path: PathBuf, file_id: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    let context = FileContext::new(file_path, file_id);
    collector().begin_file(&context);
    let previous = CURRENT_FILE.with(|slot| slot.replace(Some(context)));
    let result = f();
    CURRENT_FILE.with(|slot| *slot.borrow_mut() = previous);
    result
}

pub fn current_file() -> Option<PathBuf> {
    CURRENT_FILE.with(|slot| slot.borrow().as_ref().map(|ctx| ctx.file_path.clone()))
}

fn emit(mut event: LogEvent, context: &Context<'_>) {
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    if let Some(file) = current_file() {
        event = event.with_file(file.clone());
        if event.is_error() || event.is_warning() {
            collector().record(&file, event.clone());
        }
    }
    if let Some(service) = SERVICE.get() {
        service.log_event(&event);
    }
}

pub fn log_error_with_context(code: Code, message: &str, span: Option<Span>, context: &Context<'_>) {
    let event = LogEvent::error(code, message);
    emit(
        match span {
            Some(span) => event.with_span(span),
            None => event,
        },
        context,
    );
}

pub fn log_success_with_context(code: Code, message: &str, context: &Context<'_>) {
    emit(LogEvent::success(code, message), context);
}

pub fn log_level_with_context(level: LogLevel, message: &str, context: &Context<'_>) {
    let event = match level {
        LogLevel::Error => LogEvent::error(codes::system::INTERNAL_ERROR, message),
        LogLevel::Warning => LogEvent::warning(message),
        LogLevel::Info => LogEvent::info(message),
        LogLevel::Debug => LogEvent::debug(message),
    };
    emit(event, context);
}

pub fn processing_summary() -> RunSummary {
    collector().summary()
}

/// Collected diagnostics on stderr, unless `JACK_LOGGING_CARGO_STYLE=false`
pub fn print_cargo_style_summary() {
    if config::use_cargo_style_output() {
        eprintln!("{}", collector().render_cargo_style());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_context_is_scoped_and_nests() {
        assert!(current_file().is_none());

        let seen = with_file_context(PathBuf::from("Outer.jack"), 1, || {
            let inner = with_file_context(PathBuf::from("Inner.jack"), 2, current_file);
            (inner, current_file())
        });

        assert_eq!(seen.0, Some(PathBuf::from("Inner.jack")));
        assert_eq!(seen.1, Some(PathBuf::from("Outer.jack")));
        assert!(current_file().is_none());
    }

    #[test]
    fn test_file_context_is_per_thread() {
        with_file_context(PathBuf::from("Square.jack"), 0, || {
            let other = std::thread::spawn(current_file).join().unwrap();
            assert!(other.is_none());
        });
    }

    #[test]
    fn test_errors_under_context_reach_collector() {
        let path = PathBuf::from("CollectorProbe.jack");
        with_file_context(path.clone(), 7, || {
            log_error_with_context(
                codes::syntax::UNEXPECTED_TOKEN,
                "Expected ';'",
                None,
                &[("found", &"}" as &dyn Display)],
            );
        });

        let events = collector().events_for(&path);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].file.as_deref(), Some(path.as_path()));
        assert_eq!(events[0].context["found"], "}");
        assert!(processing_summary().failed >= 1);
    }
}
