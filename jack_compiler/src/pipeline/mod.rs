//! Per-file compilation: open, tokenize and parse, generate, write
//!
//! A file is never read whole: the parser pulls tokens, and the lexer pulls
//! source lines from the opened file only as it needs them.
//!
//! Each stage logs its own failure when it happens; the pipeline only wraps
//! the error and adds the file context.

mod error;
mod result;

pub use error::PipelineError;
pub use result::{CompileMetrics, CompiledClass, PipelineResult};

use crate::codegen::{self, render};
use crate::file_processor::{FileProcessor, SourceReader, OUTPUT_EXTENSION};
use crate::lexical::Lexer;
use crate::logging::{self, codes};
use crate::syntax::{self, JackParser};
use crate::tokens::TokenStream;
use crate::{log_info, log_success, log_warning};
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

/// Compile one class held in memory. `name` only labels log events.
pub fn compile_source(name: &str, source: &str) -> Result<CompiledClass, PipelineError> {
    compile_with_lexer(name, Lexer::from_source(source))
}

/// Compile one class read from `reader` a line at a time
pub fn compile_reader<R: BufRead + 'static>(
    name: &str,
    reader: R,
) -> Result<CompiledClass, PipelineError> {
    compile_with_lexer(name, Lexer::from_reader(reader))
}

fn compile_with_lexer(name: &str, lexer: Lexer) -> Result<CompiledClass, PipelineError> {
    let start_time = Instant::now();

    let mut parser = JackParser::new(TokenStream::new(lexer)?);
    let class = syntax::run_parser(&mut parser)?;

    let lexical_metrics = parser.tokens().lexer().metrics();
    log_success!(
        codes::success::TOKENIZATION_COMPLETE,
        "Source tokenized",
        "source" => name,
        "tokens" => lexical_metrics.total_tokens,
        "identifiers" => lexical_metrics.identifier_tokens,
        "comments" => lexical_metrics.comment_count
    );
    let token_count = parser.tokens().consumed();
    let line_count = parser.tokens().lexer().lines_read();

    let commands = codegen::compile_class(&class)?;
    let text = render(&commands);

    Ok(CompiledClass {
        class_name: class.name,
        metrics: CompileMetrics {
            token_count,
            line_count,
            subroutine_count: class.subroutines.len(),
            command_count: commands.len(),
            duration: start_time.elapsed(),
        },
        commands,
        text,
    })
}

/// Compile `file_path` and write `<basename>.vm` beside it
pub fn process_file(file_path: &Path) -> Result<PipelineResult, PipelineError> {
    process_file_with_processor(file_path, 0, &FileProcessor::new())
}

/// As [`process_file`], with a batch file id and a configured reader
pub fn process_file_with_processor(
    file_path: &Path,
    file_id: usize,
    processor: &FileProcessor,
) -> Result<PipelineResult, PipelineError> {
    let start_time = Instant::now();

    logging::with_file_context(file_path.to_path_buf(), file_id, || {
        let display = file_path.display().to_string();
        log_info!("Compiling", "file" => display.as_str());

        let SourceReader { mut metadata, reader } = processor.open_file(file_path)?;
        let compiled = compile_reader(&display, reader)?;
        metadata.line_count = compiled.metrics.line_count;
        processor.report(&metadata, compiled.metrics.duration);

        if metadata.class_name() != Some(compiled.class_name.as_str()) {
            log_warning!("Class name differs from file name",
                "class" => compiled.class_name.as_str(),
                "file" => display.as_str());
        }

        let output_path = processor.write_output(file_path, OUTPUT_EXTENSION, &compiled.text)?;

        let result = PipelineResult {
            file_metadata: metadata,
            output_path,
            compiled,
            processing_duration: start_time.elapsed(),
        };
        result.log_success(&display);

        Ok(result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::VmCommand;
    use crate::lexical::LexerError;
    use crate::syntax::SyntaxError;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    const MAIN: &str = r#"
        // Prints 3
        class Main {
            function void main() {
                do Output.printInt(1 + 2);
                return;
            }
        }
    "#;

    #[test]
    fn test_compile_source() {
        let compiled = compile_source("Main.jack", MAIN).unwrap();
        assert_eq!(compiled.class_name, "Main");
        assert_eq!(compiled.metrics.subroutine_count, 1);
        assert_eq!(compiled.metrics.command_count, compiled.commands.len());
        assert_eq!(compiled.function_count(), 1);
        assert_eq!(compiled.commands[0], VmCommand::Function {
            name: "Main.main".to_string(),
            n_locals: 0,
        });
        assert!(compiled.text.starts_with("function Main.main 0\npush constant 1\n"));
        assert!(compiled.metrics.token_count > 10);
    }

    #[test]
    fn test_stage_errors_are_classified() {
        let lexical = compile_source("A.jack", "class A { function void f() { let x = 99999; } }");
        assert_matches!(lexical, Err(PipelineError::LexicalAnalysis(_)));
        let span = lexical.unwrap_err().span().unwrap();
        assert_eq!((span.start.line, span.start.column), (1, 39));

        let syntax = compile_source("A.jack", "class A { function void f() { let = 1; } }");
        assert_matches!(syntax, Err(PipelineError::SyntaxAnalysis(SyntaxError::UnexpectedToken { .. })));
        assert_eq!(syntax.unwrap_err().span().map(|s| s.start.column), Some(35));

        let codegen = compile_source("A.jack", "class A { function void f() { let y = 1; return; } }");
        assert_matches!(codegen, Err(PipelineError::CodeGeneration(_)));
        assert_eq!(codegen.unwrap_err().stage(), "codegen");
    }

    #[test]
    fn test_process_file_writes_vm_beside_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Main.jack");
        fs::write(&source, MAIN).unwrap();

        let result = process_file(&source).unwrap();
        assert_eq!(result.output_path, dir.path().join("Main.vm"));
        assert_eq!(fs::read_to_string(&result.output_path).unwrap(), result.compiled.text);
        assert_eq!(result.file_metadata.line_count, MAIN.lines().count());
        assert_eq!(result.compiled.text, compile_source("Main.jack", MAIN).unwrap().text);
    }

    #[test]
    fn test_reader_and_string_compile_alike() {
        let source = "class Counter {\n  /* spans\n     lines */ field int n;\n\
                      method void bump() { let n = n + 1; return; }\n}\n";
        let from_reader = compile_reader("Counter", std::io::Cursor::new(source.to_string())).unwrap();
        let from_string = compile_source("Counter", source).unwrap();
        assert_eq!(from_reader.commands, from_string.commands);
        assert_eq!(from_reader.metrics.token_count, from_string.metrics.token_count);
        assert_eq!(from_reader.metrics.line_count, 5);
    }

    #[test]
    fn test_unclosed_comment_in_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Open.jack");
        fs::write(&source, "class Open {\n  /* never\n  closed }\n").unwrap();

        let err = process_file(&source).unwrap_err();
        assert_matches!(
            err,
            PipelineError::LexicalAnalysis(LexerError::UnterminatedComment { line: 2, column: 3 })
        );
        assert!(!dir.path().join("Open.vm").exists());
    }

    #[test]
    fn test_invalid_utf8_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Bad.jack");
        fs::write(&source, [b'c', b'l', 0xff, b'\n']).unwrap();

        let err = process_file(&source).unwrap_err();
        assert_eq!(err.error_code(), codes::file_processing::INVALID_ENCODING);
    }

    #[test]
    fn test_failed_file_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Broken.jack");
        fs::write(&source, "class Broken { function void f() { do g(; } }").unwrap();

        let err = process_file(&source).unwrap_err();
        assert_matches!(err, PipelineError::SyntaxAnalysis(_));
        assert!(!dir.path().join("Broken.vm").exists());
    }

    #[test]
    fn test_missing_file() {
        let err = process_file(Path::new("does/not/exist/Main.jack")).unwrap_err();
        assert_matches!(err, PipelineError::FileProcessing(_));
        assert_eq!(err.error_code(), codes::file_processing::FILE_NOT_FOUND);
    }
}
