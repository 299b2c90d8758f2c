//! Per-file diagnostics gathered during a run, printed cargo-style at the end

use super::config::get_max_log_events_per_file;
use super::events::LogEvent;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The file the current thread is compiling
#[derive(Debug, Clone)]
pub struct FileContext {
    pub file_path: PathBuf,
    pub file_id: usize,
    pub started: Instant,
}

impl FileContext {
    pub fn new(file_path: PathBuf, file_id: usize) -> Self {
        Self {
            file_path,
            file_id,
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub clean: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Default)]
struct FileRecord {
    events: Vec<LogEvent>,
    dropped: usize,
}

/// Thread-safe store of warnings and errors keyed by source file
pub struct ErrorCollector {
    files: Mutex<BTreeMap<PathBuf, FileRecord>>,
    started: Instant,
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            started: Instant::now(),
        }
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, FileRecord>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a file in the summary even if it never reports anything
    pub fn begin_file(&self, context: &FileContext) {
        self.files().entry(context.file_path.clone()).or_default();
    }

    /// Events past the per-file cap are counted, not stored
    pub fn record(&self, file_path: &Path, event: LogEvent) {
        let mut files = self.files();
        let record = files.entry(file_path.to_path_buf()).or_default();
        if record.events.len() < get_max_log_events_per_file() {
            record.events.push(event);
        } else {
            record.dropped += 1;
        }
    }

    pub fn events_for(&self, file_path: &Path) -> Vec<LogEvent> {
        self.files()
            .get(file_path)
            .map(|record| record.events.clone())
            .unwrap_or_default()
    }

    pub fn has_errors(&self, file_path: &Path) -> bool {
        self.files()
            .get(file_path)
            .is_some_and(|record| record.events.iter().any(LogEvent::is_error))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn summary(&self) -> RunSummary {
        self.files()
            .values()
            .fold(RunSummary::default(), |mut summary, record| {
                let errors = record.events.iter().filter(|e| e.is_error()).count();
                summary.files += 1;
                summary.errors += errors;
                summary.warnings += record.events.iter().filter(|e| e.is_warning()).count();
                if errors > 0 {
                    summary.failed += 1;
                } else {
                    summary.clean += 1;
                }
                summary
            })
    }

    /// `error[CODE]: message` blocks with locations and help lines, then totals
    pub fn render_cargo_style(&self) -> String {
        let mut out = String::new();

        for (path, record) in self.files().iter() {
            for event in record.events.iter().filter(|e| e.is_error() || e.is_warning()) {
                let label = if event.is_error() { "error" } else { "warning" };
                let _ = writeln!(out, "{}[{}]: {}", label, event.code, event.message);
                match &event.span {
                    Some(span) => {
                        let _ = writeln!(out, "  --> {}:{}", path.display(), span.start);
                    }
                    None => {
                        let _ = writeln!(out, "  --> {}", path.display());
                    }
                }
                for (key, value) in &event.context {
                    let _ = writeln!(out, "   = {}: {}", key, value);
                }
                if event.is_error() && event.category() != "Unknown" {
                    let _ = writeln!(out, "   = help: {}", event.recommended_action());
                }
                out.push('\n');
            }
            if record.dropped > 0 {
                let _ = writeln!(
                    out,
                    "note: {} more event(s) for {} not shown\n",
                    record.dropped,
                    path.display()
                );
            }
        }

        let summary = self.summary();
        let _ = write!(
            out,
            "{} file(s) processed: {} compiled, {} failed",
            summary.files, summary.clean, summary.failed
        );
        if summary.errors > 0 {
            let _ = write!(out, "; {} error(s)", summary.errors);
        }
        if summary.warnings > 0 {
            let _ = write!(out, "; {} warning(s)", summary.warnings);
        }
        out
    }
}
