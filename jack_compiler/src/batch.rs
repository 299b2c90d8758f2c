//! Directory compilation
//!
//! Every `.jack` file directly inside a directory is compiled on its own:
//! own tokens, own AST, own symbol tables, own label counters. A failing
//! file never changes the output of another one. Files run sequentially or
//! on scoped worker threads; results are sorted by path either way.

use crate::config::compile_time::batch_processing::{MAX_FILES_PER_BATCH, MAX_WORKER_THREADS};
use crate::config::runtime::{BatchPreferences, FileProcessorPreferences, RuntimeConfig};
use crate::file_processor::{is_jack_source, FileProcessor};
use crate::logging::{codes, Code};
use crate::pipeline::{self, PipelineError, PipelineResult};
use crate::{log_debug, log_error, log_info, log_success, log_warning};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 1 compiles sequentially on the calling thread
    pub max_threads: usize,
    /// Keep only the first `n` files of the sorted listing
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    /// Stop scheduling new files after the first failure
    pub fail_fast: bool,
    pub file_processor: FileProcessorPreferences,
}

impl BatchConfig {
    pub fn from_preferences(prefs: &BatchPreferences) -> Self {
        Self {
            max_threads: prefs.max_threads.clamp(1, MAX_WORKER_THREADS),
            max_files: None,
            progress_reporting: prefs.progress_reporting,
            fail_fast: prefs.fail_fast,
            file_processor: FileProcessorPreferences::default(),
        }
    }

    /// Batch and file-reading preferences from a loaded config
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        Self {
            file_processor: config.file_processor.clone(),
            ..Self::from_preferences(&config.batch)
        }
    }

    pub fn sequential() -> Self {
        Self {
            max_threads: 1,
            ..Self::default()
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_preferences(&BatchPreferences::default())
    }
}

#[derive(Debug, Default)]
pub struct BatchResults {
    pub successful_files: Vec<(PathBuf, PipelineResult)>,
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    /// Files discovered but never started because of fail-fast
    pub fn skipped_count(&self) -> usize {
        self.files_discovered.saturating_sub(self.files_processed)
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            self.success_count() as f64 / self.files_processed as f64
        }
    }

    pub fn add_success(&mut self, file_path: PathBuf, result: PipelineResult) {
        self.successful_files.push((file_path, result));
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    fn sort(&mut self) {
        self.successful_files.sort_by(|a, b| a.0.cmp(&b.0));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files compiled, {} succeeded ({:.1}%), {} failed, {} skipped in {:.2}s",
            self.files_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.failure_count(),
            self.skipped_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No .jack files found in directory: {path}")]
    NoFilesFound { path: String },

    #[error("Too many files found: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("IO error during directory listing: {error}")]
    IoError { error: String },

    #[error("Worker thread error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DirectoryNotFound { .. } | Self::NoFilesFound { .. } | Self::IoError { .. } => {
                codes::batch::DISCOVERY_FAILED
            }
            Self::TooManyFiles { .. } => codes::batch::TOO_MANY_FILES,
            Self::ThreadError { .. } => codes::batch::WORKER_PANICKED,
        }
    }

    fn report(self) -> Self {
        log_error!(self.error_code(), &self.to_string());
        self
    }
}

/// `.jack` files directly inside `dir_path`, sorted by path
pub fn discover_jack_files(dir_path: &Path, config: &BatchConfig) -> Result<Vec<PathBuf>, BatchError> {
    log_info!("Starting file discovery", "directory" => dir_path.display());

    if !dir_path.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir_path.display().to_string(),
        }
        .report());
    }

    let entries = fs::read_dir(dir_path).map_err(|e| {
        BatchError::IoError {
            error: e.to_string(),
        }
        .report()
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| {
                BatchError::IoError {
                    error: e.to_string(),
                }
                .report()
            })?
            .path();
        if path.is_file() && is_jack_source(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(BatchError::NoFilesFound {
            path: dir_path.display().to_string(),
        }
        .report());
    }

    if files.len() > MAX_FILES_PER_BATCH {
        return Err(BatchError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES_PER_BATCH,
        }
        .report());
    }

    files.sort();

    if let Some(max_files) = config.max_files {
        if files.len() > max_files {
            log_warning!("Reached maximum file limit",
                "files_found" => files.len(),
                "limit" => max_files);
            files.truncate(max_files);
        }
    }

    log_debug!("File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display());

    Ok(files)
}

/// Stop scheduling after `error`: always for internal faults, and for any
/// failure with `fail_fast`
fn stops_batch(config: &BatchConfig, error: &PipelineError) -> bool {
    config.fail_fast || error.requires_halt()
}

pub fn process_directory_sequential(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    log_info!("Starting sequential batch compilation", "directory" => dir_path.display());

    let files = discover_jack_files(dir_path, config)?;
    let processor = FileProcessor::from_preferences(&config.file_processor);

    let mut results = BatchResults::new();
    results.files_discovered = files.len();

    for (file_id, file_path) in files.iter().enumerate() {
        if config.progress_reporting {
            println!("Compiling file {} of {}: {}", file_id + 1, files.len(), file_path.display());
        }

        match pipeline::process_file_with_processor(file_path, file_id, &processor) {
            Ok(result) => results.add_success(file_path.clone(), result),
            Err(error) => {
                let stop = stops_batch(config, &error);
                results.add_failure(file_path.clone(), error);
                if stop {
                    log_warning!("Stopping batch compilation after a failure",
                        "fail_fast" => config.fail_fast,
                        "skipped" => files.len() - file_id - 1);
                    break;
                }
            }
        }
    }

    results.processing_duration = start_time.elapsed();
    log_completion("sequential", &results, 1);
    Ok(results)
}

/// Workers pull the next file index from a shared cursor until the list is
/// exhausted or a failure that stops the batch has been recorded
pub fn process_directory_parallel(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    let files = discover_jack_files(dir_path, config)?;
    let threads = config.max_threads.clamp(1, MAX_WORKER_THREADS).min(files.len());

    log_info!("Starting parallel batch compilation",
        "directory" => dir_path.display(),
        "threads" => threads,
        "files" => files.len());

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let results = Mutex::new(BatchResults::new());

    let panicked = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    let processor = FileProcessor::from_preferences(&config.file_processor);
                    while !stop.load(Ordering::SeqCst) {
                        let file_id = next.fetch_add(1, Ordering::SeqCst);
                        let Some(file_path) = files.get(file_id) else {
                            break;
                        };
                        let outcome =
                            pipeline::process_file_with_processor(file_path, file_id, &processor);

                        let mut results = results.lock().unwrap_or_else(PoisonError::into_inner);
                        match outcome {
                            Ok(result) => results.add_success(file_path.clone(), result),
                            Err(error) => {
                                if stops_batch(config, &error) {
                                    stop.store(true, Ordering::SeqCst);
                                }
                                results.add_failure(file_path.clone(), error);
                            }
                        }
                    }
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join())
            .filter(Result::is_err)
            .count()
    });

    if panicked > 0 {
        return Err(BatchError::ThreadError {
            message: format!("{} worker thread(s) panicked", panicked),
        }
        .report());
    }

    let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    results.files_discovered = files.len();
    results.sort();
    results.processing_duration = start_time.elapsed();

    if stop.load(Ordering::SeqCst) {
        log_warning!("Stopped scheduling after a failure",
            "fail_fast" => config.fail_fast,
            "skipped" => results.skipped_count());
    }

    log_completion("parallel", &results, threads);
    Ok(results)
}

fn log_completion(mode: &str, results: &BatchResults, threads: usize) {
    log_success!(
        codes::success::BATCH_PROCESSING_COMPLETE,
        "Batch compilation completed",
        "mode" => mode,
        "files_processed" => results.files_processed,
        "successful" => results.success_count(),
        "failed" => results.failure_count(),
        "threads" => threads,
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );
}

pub fn process_directory(dir_path: &Path) -> Result<BatchResults, BatchError> {
    process_directory_with_config(dir_path, &BatchConfig::default())
}

pub fn process_directory_with_config(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    if config.max_threads <= 1 {
        process_directory_sequential(dir_path, config)
    } else {
        process_directory_parallel(dir_path, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodeGenError;
    use crate::utils::Span;
    use assert_matches::assert_matches;
    use tempfile::{tempdir, TempDir};

    fn class_source(name: &str) -> String {
        format!(
            "class {} {{ function int value() {{ var int x; let x = 6 * 7; return x; }} }}",
            name
        )
    }

    /// Alpha and Gamma compile, Beta has an undeclared variable
    fn fixture() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Alpha.jack"), class_source("Alpha")).unwrap();
        fs::write(
            dir.path().join("Beta.jack"),
            "class Beta { function void f() { let y = 1; return; } }",
        )
        .unwrap();
        fs::write(dir.path().join("Gamma.jack"), class_source("Gamma")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a class").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("Deep.jack"), class_source("Deep")).unwrap();
        dir
    }

    fn config(threads: usize) -> BatchConfig {
        BatchConfig {
            max_threads: threads,
            max_files: None,
            progress_reporting: false,
            fail_fast: false,
            file_processor: FileProcessorPreferences {
                require_jack_extension: true,
                enable_performance_logging: false,
            },
        }
    }

    fn names(paths: impl Iterator<Item = PathBuf>) -> Vec<String> {
        paths
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discovery_is_sorted_and_non_recursive() {
        let dir = fixture();
        let files = discover_jack_files(dir.path(), &config(1)).unwrap();
        assert_eq!(
            names(files.into_iter()),
            vec!["Alpha.jack", "Beta.jack", "Gamma.jack"]
        );
    }

    #[test]
    fn test_discovery_max_files() {
        let dir = fixture();
        let mut config = config(1);
        config.max_files = Some(2);
        let files = discover_jack_files(dir.path(), &config).unwrap();
        assert_eq!(names(files.into_iter()), vec!["Alpha.jack", "Beta.jack"]);
    }

    #[test]
    fn test_discovery_errors() {
        let empty = tempdir().unwrap();
        assert_matches!(
            discover_jack_files(empty.path(), &config(1)),
            Err(BatchError::NoFilesFound { .. })
        );

        let missing = empty.path().join("missing");
        let err = discover_jack_files(&missing, &config(1)).unwrap_err();
        assert_matches!(err, BatchError::DirectoryNotFound { .. });
        assert_eq!(err.error_code(), codes::batch::DISCOVERY_FAILED);
        assert_matches!(
            process_directory(&missing),
            Err(BatchError::DirectoryNotFound { .. })
        );
    }

    #[test]
    fn test_failure_is_isolated() {
        let dir = fixture();
        let results = process_directory_with_config(dir.path(), &config(1)).unwrap();

        assert_eq!(results.files_discovered, 3);
        assert_eq!(results.success_count(), 2);
        assert_eq!(results.failure_count(), 1);
        assert_matches!(results.failed_files[0].1, PipelineError::CodeGeneration(_));

        assert!(dir.path().join("Alpha.vm").exists());
        assert!(!dir.path().join("Beta.vm").exists());
        assert!(dir.path().join("Gamma.vm").exists());
        assert!(!dir.path().join("nested").join("Deep.vm").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential_dir = fixture();
        let parallel_dir = fixture();

        let sequential = process_directory_with_config(sequential_dir.path(), &config(1)).unwrap();
        let parallel = process_directory_with_config(parallel_dir.path(), &config(3)).unwrap();

        let texts = |results: &BatchResults| -> Vec<String> {
            results
                .successful_files
                .iter()
                .map(|(_, r)| r.compiled.text.clone())
                .collect()
        };
        assert_eq!(texts(&sequential), texts(&parallel));
        assert_eq!(
            names(parallel.successful_files.iter().map(|(p, _)| p.clone())),
            vec!["Alpha.jack", "Gamma.jack"]
        );
        assert_eq!(parallel.failure_count(), 1);
    }

    #[test]
    fn test_fail_fast_sequential() {
        let dir = fixture();
        let mut config = config(1);
        config.fail_fast = true;

        let results = process_directory_with_config(dir.path(), &config).unwrap();
        assert_eq!(results.files_processed, 2);
        assert_eq!(results.skipped_count(), 1);
        assert!(!dir.path().join("Gamma.vm").exists());
    }

    #[test]
    fn test_only_fail_fast_or_internal_faults_stop() {
        let unresolved = PipelineError::CodeGeneration(CodeGenError::UnresolvedIdentifier {
            name: "y".to_string(),
            subroutine: "Beta.f".to_string(),
            span: Span::default(),
        });
        let internal = PipelineError::pipeline_error("worker state lost");

        assert!(!stops_batch(&config(1), &unresolved));
        assert!(stops_batch(&config(1), &internal));

        let mut fail_fast = config(1);
        fail_fast.fail_fast = true;
        assert!(stops_batch(&fail_fast, &unresolved));
    }

    #[test]
    fn test_batch_results_summary() {
        let mut results = BatchResults::new();
        assert_eq!(results.success_rate(), 0.0);
        results.files_discovered = 3;
        results.add_failure(
            PathBuf::from("A.jack"),
            PipelineError::pipeline_error("boom"),
        );
        assert_eq!(results.skipped_count(), 2);
        assert!(results.summary().contains("1 failed, 2 skipped"));
    }
}
