// Generates `compile_time` limit constants from config/<profile>.toml
use serde::Deserialize;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Limits {
    file_processing: FileProcessing,
    lexical: Lexical,
    syntax: Syntax,
    codegen: Codegen,
    batch_processing: BatchProcessing,
    logging: Logging,
}

#[derive(Deserialize)]
struct FileProcessing {
    max_file_size: u64,
    large_file_threshold: u64,
}

#[derive(Deserialize)]
struct Lexical {
    max_string_size: usize,
    max_identifier_length: usize,
    max_integer_literal: u16,
    max_token_count: usize,
}

#[derive(Deserialize)]
struct Syntax {
    max_parse_depth: usize,
}

#[derive(Deserialize)]
struct Codegen {
    max_commands_per_class: usize,
}

#[derive(Deserialize)]
struct BatchProcessing {
    max_worker_threads: usize,
    max_files_per_batch: usize,
}

#[derive(Deserialize)]
struct Logging {
    max_error_collection: usize,
    max_log_events_per_file: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=JACK_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=JACK_CONFIG_DIR");

    let profile = env::var("JACK_BUILD_PROFILE").unwrap_or_else(|_| "development".into());
    let path = profile_path(&profile);
    println!("cargo:rerun-if-changed={}", path.display());

    let text = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read build profile {}: {}", path.display(), e));
    let limits: Limits = toml::from_str(&text)
        .unwrap_or_else(|e| panic!("invalid build profile {}: {}", path.display(), e));

    if let Err(problem) = check(&limits, &profile) {
        panic!("{}: {}", path.display(), problem);
    }

    let out = Path::new(&env::var("OUT_DIR").expect("OUT_DIR is set by cargo")).join("constants.rs");
    fs::write(&out, render(&limits, &profile)).expect("OUT_DIR is writable");
}

/// `<workspace>/<JACK_CONFIG_DIR or config>/<profile>.toml`
fn profile_path(profile: &str) -> PathBuf {
    let manifest = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let workspace = Path::new(&manifest)
        .parent()
        .expect("jack_compiler lives inside the workspace");
    let dir = env::var("JACK_CONFIG_DIR").unwrap_or_else(|_| "config".into());
    workspace.join(dir).join(format!("{}.toml", profile))
}

fn check(limits: &Limits, profile: &str) -> Result<(), String> {
    let files = &limits.file_processing;
    if files.max_file_size > 1_000_000_000 {
        return Err("max_file_size is above 1 GB".into());
    }
    if files.large_file_threshold > files.max_file_size {
        return Err("large_file_threshold exceeds max_file_size".into());
    }
    // A-instructions load 15-bit constants
    if limits.lexical.max_integer_literal > 32767 {
        return Err("max_integer_literal does not fit in 15 bits".into());
    }
    if !(1..=256).contains(&limits.batch_processing.max_worker_threads) {
        return Err("max_worker_threads must be within 1..=256".into());
    }
    if limits.syntax.max_parse_depth < 16 {
        return Err("max_parse_depth below 16 rejects ordinary programs".into());
    }
    if profile == "production" && files.max_file_size > 50_000_000 {
        return Err("production max_file_size is above 50 MB".into());
    }
    Ok(())
}

fn render(limits: &Limits, profile: &str) -> String {
    let groups: [(&str, Vec<(&str, &str, String)>); 6] = [
        ("file_processing", vec![
            ("MAX_FILE_SIZE", "u64", limits.file_processing.max_file_size.to_string()),
            ("LARGE_FILE_THRESHOLD", "u64", limits.file_processing.large_file_threshold.to_string()),
        ]),
        ("lexical", vec![
            ("MAX_STRING_SIZE", "usize", limits.lexical.max_string_size.to_string()),
            ("MAX_IDENTIFIER_LENGTH", "usize", limits.lexical.max_identifier_length.to_string()),
            ("MAX_INTEGER_LITERAL", "u16", limits.lexical.max_integer_literal.to_string()),
            ("MAX_TOKEN_COUNT", "usize", limits.lexical.max_token_count.to_string()),
        ]),
        ("syntax", vec![
            ("MAX_PARSE_DEPTH", "usize", limits.syntax.max_parse_depth.to_string()),
        ]),
        ("codegen", vec![
            ("MAX_COMMANDS_PER_CLASS", "usize", limits.codegen.max_commands_per_class.to_string()),
        ]),
        ("batch_processing", vec![
            ("MAX_WORKER_THREADS", "usize", limits.batch_processing.max_worker_threads.to_string()),
            ("MAX_FILES_PER_BATCH", "usize", limits.batch_processing.max_files_per_batch.to_string()),
        ]),
        ("logging", vec![
            ("MAX_ERROR_COLLECTION", "usize", limits.logging.max_error_collection.to_string()),
            ("MAX_LOG_EVENTS_PER_FILE", "usize", limits.logging.max_log_events_per_file.to_string()),
        ]),
    ];

    let mut code = format!("// Generated by build.rs from the `{}` profile\n\npub mod compile_time {{\n", profile);
    for (module, constants) in groups {
        let _ = writeln!(code, "    pub mod {} {{", module);
        for (name, ty, value) in constants {
            let _ = writeln!(code, "        pub const {}: {} = {};", name, ty, value);
        }
        code.push_str("    }\n");
    }
    code.push_str("}\n");
    code
}
