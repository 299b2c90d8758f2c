//! Error and success codes with their classification metadata
//!
//! Single source of truth for every code the compiler logs. Stage error types
//! map themselves onto these through their `error_code()` methods.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
    pub const OUTPUT_WRITE_FAILED: Code = Code::new("E013");
}

pub mod lexical {
    use super::Code;

    pub const UNRECOGNIZED_INPUT: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const INTEGER_OUT_OF_RANGE: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E026");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
}

pub mod syntax {
    use super::Code;

    pub const UNEXPECTED_END_OF_INPUT: Code = Code::new("E041");
    pub const TRAILING_INPUT: Code = Code::new("E042");
    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E087");
}

pub mod codegen {
    use super::Code;

    pub const UNRESOLVED_IDENTIFIER: Code = Code::new("E110");
    pub const UNSUPPORTED_NODE: Code = Code::new("E111");
    pub const COMMAND_LIMIT_EXCEEDED: Code = Code::new("E112");
}

pub mod batch {
    use super::Code;

    pub const DISCOVERY_FAILED: Code = Code::new("E150");
    pub const TOO_MANY_FILES: Code = Code::new("E151");
    pub const WORKER_PANICKED: Code = Code::new("E152");
}

/// Stack-machine parser, translator and interpreter
pub mod vm {
    use super::Code;

    pub const UNKNOWN_COMMAND: Code = Code::new("E200");
    pub const INVALID_SEGMENT: Code = Code::new("E201");
    pub const INVALID_INDEX: Code = Code::new("E202");
    pub const INVALID_NAME: Code = Code::new("E203");
    pub const ILLEGAL_OPERATION: Code = Code::new("E210");
    pub const UNKNOWN_FUNCTION: Code = Code::new("E220");
    pub const UNKNOWN_LABEL: Code = Code::new("E221");
    pub const RUNTIME_FAULT: Code = Code::new("E222");
    pub const STEP_LIMIT_EXCEEDED: Code = Code::new("E223");
}

pub mod assembler {
    use super::Code;

    pub const UNKNOWN_MNEMONIC: Code = Code::new("E300");
    pub const MALFORMED_INSTRUCTION: Code = Code::new("E301");
    pub const CONSTANT_OUT_OF_RANGE: Code = Code::new("E302");
    pub const DUPLICATE_LABEL: Code = Code::new("E303");
    pub const PROGRAM_TOO_LARGE: Code = Code::new("E304");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const AST_CONSTRUCTION_COMPLETE: Code = Code::new("I040");
    pub const SYMBOL_TABLES_BUILT: Code = Code::new("I050");
    pub const CODE_GENERATION_COMPLETE: Code = Code::new("I060");
    pub const OUTPUT_WRITTEN: Code = Code::new("I061");
    pub const BATCH_PROCESSING_COMPLETE: Code = Code::new("I070");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

type RegistryRow = (
    Code,
    &'static str,
    Severity,
    bool,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const REGISTRY_ROWS: &[RegistryRow] = &[
    // System
    (system::INTERNAL_ERROR, "System", Severity::Critical, true,
        "Internal compiler error", "File a bug report with the input that triggered it"),
    (system::INITIALIZATION_FAILURE, "System", Severity::Critical, true,
        "Logging or configuration failed to initialize", "Check JACK_* environment variables"),
    // File processing
    (file_processing::FILE_NOT_FOUND, "FileProcessing", Severity::High, false,
        "Input file does not exist", "Check the path passed on the command line"),
    (file_processing::INVALID_EXTENSION, "FileProcessing", Severity::Medium, false,
        "Input file does not have a .jack extension", "Rename the file or set JACK_REQUIRE_JACK_EXTENSION=false"),
    (file_processing::FILE_TOO_LARGE, "FileProcessing", Severity::High, false,
        "Input file exceeds the configured size limit", "Split the class or raise max_file_size in the build profile"),
    (file_processing::PERMISSION_DENIED, "FileProcessing", Severity::High, false,
        "Input file is not readable", "Check file permissions"),
    (file_processing::INVALID_ENCODING, "FileProcessing", Severity::High, false,
        "Input file is not valid UTF-8", "Re-save the file as UTF-8"),
    (file_processing::IO_ERROR, "FileProcessing", Severity::High, false,
        "I/O error while reading input", "Retry; check the filesystem"),
    (file_processing::INVALID_PATH, "FileProcessing", Severity::High, false,
        "Path is neither a file nor a directory", "Pass a .jack file or a directory"),
    (file_processing::OUTPUT_WRITE_FAILED, "FileProcessing", Severity::High, false,
        "Could not write the .vm output file", "Check that the output directory is writable"),
    // Lexical
    (lexical::UNRECOGNIZED_INPUT, "Lexical", Severity::High, false,
        "Input matches no token rule", "Remove or fix the offending characters"),
    (lexical::UNTERMINATED_STRING, "Lexical", Severity::High, false,
        "String literal is not closed before end of line", "Add the closing double quote"),
    (lexical::INTEGER_OUT_OF_RANGE, "Lexical", Severity::High, false,
        "Integer literal exceeds 32767", "Use a smaller constant or compute the value"),
    (lexical::IDENTIFIER_TOO_LONG, "Lexical", Severity::Medium, false,
        "Identifier exceeds the configured length limit", "Use a shorter name"),
    (lexical::STRING_TOO_LARGE, "Lexical", Severity::Medium, false,
        "String literal exceeds the configured size limit", "Split the string"),
    (lexical::UNTERMINATED_COMMENT, "Lexical", Severity::High, false,
        "Block comment is not closed", "Add the closing */"),
    (lexical::TOO_MANY_TOKENS, "Lexical", Severity::High, false,
        "Source file produces too many tokens", "Split the class"),
    // Syntax
    (syntax::UNEXPECTED_END_OF_INPUT, "Syntax", Severity::High, false,
        "Source ended in the middle of a construct", "Check for missing closing braces"),
    (syntax::TRAILING_INPUT, "Syntax", Severity::High, false,
        "Tokens follow the end of the class declaration", "One class per file"),
    (syntax::UNEXPECTED_TOKEN, "Syntax", Severity::High, false,
        "Token does not fit the grammar at this point", "Check the expected token named in the message"),
    (syntax::MAX_RECURSION_DEPTH, "Syntax", Severity::High, false,
        "Expression or statement nesting is too deep", "Flatten the nested construct"),
    // Code generation
    (codegen::UNRESOLVED_IDENTIFIER, "CodeGeneration", Severity::High, false,
        "Identifier is not declared in subroutine or class scope", "Declare the variable or fix the spelling"),
    (codegen::UNSUPPORTED_NODE, "CodeGeneration", Severity::Critical, true,
        "AST node cannot be lowered in this position", "File a bug report; parser and generator disagree"),
    (codegen::COMMAND_LIMIT_EXCEEDED, "CodeGeneration", Severity::High, false,
        "Class produces too many stack-machine commands", "Split the class"),
    // Batch
    (batch::DISCOVERY_FAILED, "Batch", Severity::High, false,
        "Could not list the input directory", "Check directory permissions"),
    (batch::TOO_MANY_FILES, "Batch", Severity::Medium, false,
        "Directory holds more source files than the batch limit", "Pass --max-files or split the directory"),
    (batch::WORKER_PANICKED, "Batch", Severity::Critical, true,
        "A compilation worker thread panicked", "File a bug report"),
    // Stack machine
    (vm::UNKNOWN_COMMAND, "VirtualMachine", Severity::High, false,
        "Line is not a stack-machine command", "Check the command spelling and field count"),
    (vm::INVALID_SEGMENT, "VirtualMachine", Severity::High, false,
        "Unknown memory segment", "Use argument, local, static, constant, this, that, pointer or temp"),
    (vm::INVALID_INDEX, "VirtualMachine", Severity::High, false,
        "Segment index is malformed or out of range", "pointer takes 0 or 1, temp 0 to 7"),
    (vm::INVALID_NAME, "VirtualMachine", Severity::High, false,
        "Label or function name is not a valid symbol", "Names may not start with a digit"),
    (vm::ILLEGAL_OPERATION, "VirtualMachine", Severity::High, false,
        "Command is not allowed in this position", "Check the surrounding function declaration"),
    (vm::UNKNOWN_FUNCTION, "VirtualMachine", Severity::High, false,
        "Called function is neither defined nor built in", "Add the class defining it to the program"),
    (vm::UNKNOWN_LABEL, "VirtualMachine", Severity::High, false,
        "Jump target is not defined in the enclosing function", "Define the label in the same function"),
    (vm::RUNTIME_FAULT, "VirtualMachine", Severity::High, false,
        "Execution fault in the interpreter", "Inspect the function named in the message"),
    (vm::STEP_LIMIT_EXCEEDED, "VirtualMachine", Severity::Medium, false,
        "Execution did not finish within the step limit", "Check for an infinite loop or raise the limit"),
    // Assembler
    (assembler::UNKNOWN_MNEMONIC, "Assembler", Severity::High, false,
        "Unknown comp, dest or jump mnemonic", "Check the instruction against the Hack instruction set"),
    (assembler::MALFORMED_INSTRUCTION, "Assembler", Severity::High, false,
        "Line is not an A-instruction, C-instruction or label", "Check the line's syntax"),
    (assembler::CONSTANT_OUT_OF_RANGE, "Assembler", Severity::High, false,
        "A-instruction constant does not fit in 15 bits", "Use a value from 0 to 32767"),
    (assembler::DUPLICATE_LABEL, "Assembler", Severity::High, false,
        "Label is defined more than once", "Rename one of the labels"),
    (assembler::PROGRAM_TOO_LARGE, "Assembler", Severity::High, false,
        "Program exceeds the 32K instruction ROM", "Reduce the program size"),
    // Success
    (success::SYSTEM_INITIALIZATION_COMPLETED, "System", Severity::Low, false,
        "Logging initialized", "Continue"),
    (success::FILE_PROCESSING_SUCCESS, "FileProcessing", Severity::Low, false,
        "File compiled", "Continue"),
    (success::TOKENIZATION_COMPLETE, "Lexical", Severity::Low, false,
        "Tokenization completed", "Continue to parsing"),
    (success::AST_CONSTRUCTION_COMPLETE, "Syntax", Severity::Low, false,
        "Class AST built", "Continue to code generation"),
    (success::SYMBOL_TABLES_BUILT, "CodeGeneration", Severity::Low, false,
        "Class symbol table populated", "Continue"),
    (success::CODE_GENERATION_COMPLETE, "CodeGeneration", Severity::Low, false,
        "Stack-machine commands emitted", "Continue"),
    (success::OUTPUT_WRITTEN, "FileProcessing", Severity::Low, false,
        "Output file written", "Continue"),
    (success::BATCH_PROCESSING_COMPLETE, "Batch", Severity::Low, false,
        "Directory compiled", "Continue"),
];

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        REGISTRY_ROWS
            .iter()
            .map(|&(code, category, severity, requires_halt, description, action)| {
                (
                    code.as_str(),
                    ErrorMetadata {
                        code: code.as_str(),
                        category,
                        severity,
                        requires_halt,
                        description,
                        recommended_action: action,
                    },
                )
            })
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_metadata(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Whether an error stops a whole batch run, not just its own file.
/// Errors in one class never halt; internal faults do.
pub fn requires_halt(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

pub fn get_description(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_row_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for row in REGISTRY_ROWS {
            assert!(seen.insert(row.0.as_str()), "duplicate code {}", row.0);
        }
        assert_eq!(get_error_registry().len(), REGISTRY_ROWS.len());
    }

    #[test]
    fn test_lookup_functions() {
        let code = codegen::UNRESOLVED_IDENTIFIER.as_str();
        assert_eq!(get_category(code), "CodeGeneration");
        assert_eq!(get_severity(code), Severity::High);
        assert!(!get_description(code).is_empty());

        assert_eq!(get_description("E999"), "Unknown error");
        assert_eq!(get_category("E999"), "Unknown");
        assert!(!requires_halt("E999"));
    }

    #[test]
    fn test_only_internal_faults_halt() {
        for code in [system::INTERNAL_ERROR, codegen::UNSUPPORTED_NODE, batch::WORKER_PANICKED] {
            assert!(requires_halt(code.as_str()), "{} should halt", code);
        }
        for code in [
            lexical::UNRECOGNIZED_INPUT,
            lexical::UNTERMINATED_COMMENT,
            syntax::UNEXPECTED_TOKEN,
            codegen::UNRESOLVED_IDENTIFIER,
            file_processing::FILE_NOT_FOUND,
        ] {
            assert!(!requires_halt(code.as_str()), "{} should not halt", code);
        }
    }
}
