//! Reading `.jack` sources and writing `.vm` outputs

mod processor;

use crate::config::runtime::FileProcessorPreferences;
use std::path::Path;

pub use processor::{
    FileMetadata, FileProcessingResult, FileProcessor, FileProcessorError, SourceReader,
    OUTPUT_EXTENSION, SOURCE_EXTENSION,
};

/// Read a file with the environment's preferences
pub fn process_file(file_path: &Path) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::new().process_file(file_path)
}

pub fn create_processor_from_preferences(prefs: &FileProcessorPreferences) -> FileProcessor {
    FileProcessor::from_preferences(prefs)
}

/// Whether `path` names a Jack source by extension
pub fn is_jack_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_module_api() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("Main.jack");
        fs::write(&file_path, "class Main {}").unwrap();

        let result = process_file(&file_path).unwrap();
        assert_eq!(result.source, "class Main {}");
    }

    #[test]
    fn test_create_processor_from_preferences() {
        let prefs = FileProcessorPreferences {
            require_jack_extension: false,
            enable_performance_logging: false,
        };
        let processor = create_processor_from_preferences(&prefs);
        assert!(!processor.require_jack_extension);
        assert!(!processor.enable_performance_logging);
    }

    #[test]
    fn test_is_jack_source() {
        assert!(is_jack_source(Path::new("dir/Main.jack")));
        assert!(is_jack_source(Path::new("Main.JACK")));
        assert!(!is_jack_source(Path::new("Main.vm")));
        assert!(!is_jack_source(Path::new("Makefile")));
    }
}
