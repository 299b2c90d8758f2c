//! Checks and opens one `.jack` source under the build's size limit, and
//! writes its output

use crate::config::compile_time::file_processing::{LARGE_FILE_THRESHOLD, MAX_FILE_SIZE};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::{codes, Code};
use crate::{log_debug, log_error, log_success, log_warning};
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const SOURCE_EXTENSION: &str = "jack";
pub const OUTPUT_EXTENSION: &str = "vm";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Expected a .jack file, found extension {extension:?}")]
    InvalidExtension { extension: Option<String> },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("{path} is not valid UTF-8")]
    InvalidEncoding { path: String },

    #[error("I/O error: {message}")]
    IoError { message: String },

    #[error("Not a file: {path}")]
    InvalidPath { path: String },

    #[error("Failed to write {path}: {message}")]
    OutputWriteFailed { path: String, message: String },
}

impl FileProcessorError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            Self::InvalidExtension { .. } => codes::file_processing::INVALID_EXTENSION,
            Self::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            Self::PermissionDenied { .. } => codes::file_processing::PERMISSION_DENIED,
            Self::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            Self::IoError { .. } => codes::file_processing::IO_ERROR,
            Self::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
            Self::OutputWriteFailed { .. } => codes::file_processing::OUTPUT_WRITE_FAILED,
        }
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    /// Classify a failed read of `path`
    fn from_io(path: &Path, err: &io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::FileNotFound { path },
            ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            ErrorKind::InvalidData => Self::InvalidEncoding { path },
            _ => Self::IoError {
                message: format!("{}: {}", path, err),
            },
        }
    }

    fn logged(self, message: &str, path: &Path) -> Self {
        log_error!(self.error_code(), message, "path" => path.display(), "reason" => &self);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Canonical path
    pub path: PathBuf,
    pub size: u64,
    pub extension: Option<String>,
    pub line_count: usize,
}

impl FileMetadata {
    pub fn is_jack_file(&self) -> bool {
        self.extension.as_deref() == Some(SOURCE_EXTENSION)
    }

    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }

    /// `Main.jack` declares class `Main`
    pub fn class_name(&self) -> Option<&str> {
        self.path.file_stem().and_then(|stem| stem.to_str())
    }
}

fn human_readable_size(bytes: u64) -> String {
    match bytes {
        0..=1023 => format!("{} B", bytes),
        1024..=1_048_575 => format!("{:.2} KB", bytes as f64 / 1024.0),
        _ => format!("{:.2} MB", bytes as f64 / 1_048_576.0),
    }
}

#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: Duration,
}

/// A checked source, opened for the lexer to read line by line
#[derive(Debug)]
pub struct SourceReader {
    /// `line_count` is 0 until the source has been read
    pub metadata: FileMetadata,
    pub reader: BufReader<File>,
}

#[derive(Debug, Clone)]
pub struct FileProcessor {
    pub require_jack_extension: bool,
    pub enable_performance_logging: bool,
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FileProcessor {
    pub fn new() -> Self {
        Self::from_preferences(&FileProcessorPreferences::default())
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            require_jack_extension: prefs.require_jack_extension,
            enable_performance_logging: prefs.enable_performance_logging,
        }
    }

    pub fn with_jack_extension_required(self, required: bool) -> Self {
        Self {
            require_jack_extension: required,
            ..self
        }
    }

    /// Check, then read, one source file
    pub fn process_file(&self, file_path: &Path) -> Result<FileProcessingResult, FileProcessorError> {
        let started = Instant::now();
        let mut metadata = self.check(file_path)?;

        let source = fs::read_to_string(&metadata.path).map_err(|e| {
            FileProcessorError::from_io(&metadata.path, &e).logged("Cannot read source", &metadata.path)
        })?;
        metadata.line_count = source.lines().count();

        let duration = started.elapsed();
        self.report(&metadata, duration);
        Ok(FileProcessingResult {
            metadata,
            source,
            processing_duration: duration,
        })
    }

    /// Check one source file and open it without reading it
    pub fn open_file(&self, file_path: &Path) -> Result<SourceReader, FileProcessorError> {
        let metadata = self.check(file_path)?;
        let file = File::open(&metadata.path).map_err(|e| {
            FileProcessorError::from_io(&metadata.path, &e).logged("Cannot open source", &metadata.path)
        })?;
        Ok(SourceReader {
            metadata,
            reader: BufReader::new(file),
        })
    }

    /// Path, size and extension checks shared by reading and opening
    fn check(&self, file_path: &Path) -> Result<FileMetadata, FileProcessorError> {
        log_debug!("Checking source", "file" => file_path.display());

        if !file_path.is_file() && file_path.exists() {
            return Err(FileProcessorError::InvalidPath {
                path: file_path.display().to_string(),
            }
            .logged("Path is not a file", file_path));
        }

        let path = file_path
            .canonicalize()
            .map_err(|e| FileProcessorError::from_io(file_path, &e).logged("Cannot open source", file_path))?;
        let size = fs::metadata(&path)
            .map_err(|e| FileProcessorError::from_io(&path, &e).logged("Cannot stat source", &path))?
            .len();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        if size > MAX_FILE_SIZE {
            return Err(FileProcessorError::FileTooLarge {
                size,
                max_size: MAX_FILE_SIZE,
            }
            .logged("Source exceeds the size limit", &path));
        }
        if self.require_jack_extension && extension.as_deref() != Some(SOURCE_EXTENSION) {
            return Err(FileProcessorError::InvalidExtension { extension }
                .logged("Source lacks the .jack extension", &path));
        }

        Ok(FileMetadata {
            path,
            size,
            extension,
            line_count: 0,
        })
    }

    /// Large-file warning, plus timings when performance logging is on
    pub fn report(&self, metadata: &FileMetadata, duration: Duration) {
        if metadata.is_large_file() {
            log_warning!("Large source file",
                "file" => metadata.path.display(),
                "size" => human_readable_size(metadata.size));
        }
        if self.enable_performance_logging {
            log_success!(codes::success::FILE_PROCESSING_SUCCESS, "Source read",
                "file" => metadata.path.display(),
                "size" => human_readable_size(metadata.size),
                "lines" => metadata.line_count,
                "duration_ms" => format!("{:.2}", duration.as_secs_f64() * 1000.0));
        }
    }

    /// Write `contents` to `source_path` with its extension replaced; returns the new path
    pub fn write_output(
        &self,
        source_path: &Path,
        extension: &str,
        contents: &str,
    ) -> Result<PathBuf, FileProcessorError> {
        let output_path = source_path.with_extension(extension);

        if let Err(e) = fs::write(&output_path, contents) {
            return Err(FileProcessorError::OutputWriteFailed {
                path: output_path.display().to_string(),
                message: e.to_string(),
            }
            .logged("Cannot write output", &output_path));
        }

        log_success!(codes::success::OUTPUT_WRITTEN, "Output written",
            "path" => output_path.display(),
            "bytes" => contents.len());
        Ok(output_path)
    }
}
