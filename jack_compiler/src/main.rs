use jack_compiler::config::RuntimeConfig;
use jack_compiler::utils::SourceMap;
use jack_compiler::{batch, logging, pipeline};
use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("jackc");

    if args.len() < 2 {
        eprintln!("Usage: {} <input.jack|directory> [options]", program);
        eprintln!("       {} --help", program);
        return ExitCode::FAILURE;
    }

    if args[1] == "--help" || args[1] == "-h" {
        print_help(program);
        return ExitCode::SUCCESS;
    }

    let runtime = match load_runtime_config(&args[2..]) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(runtime) = &runtime {
        // Must precede init so the service picks these up
        let _ = logging::config::init_runtime_preferences(runtime.logging.clone());
    }

    if let Err(e) = logging::init_global_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let input_path = Path::new(&args[1]);
    let base = runtime
        .as_ref()
        .map(batch::BatchConfig::from_runtime)
        .unwrap_or_default();
    let batch_config = parse_batch_options(&args[2..], base);

    let succeeded = if input_path.is_file() {
        compile_single_file(input_path)
    } else if input_path.is_dir() {
        compile_directory(input_path, &batch_config)
    } else {
        eprintln!("Error: input must be a .jack file or a directory");
        eprintln!("  Path: {}", input_path.display());
        false
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// `--config <file>` anywhere among the options
fn load_runtime_config(options: &[String]) -> Result<Option<RuntimeConfig>, String> {
    match options.iter().position(|arg| arg == "--config") {
        None => Ok(None),
        Some(at) => {
            let path = options
                .get(at + 1)
                .ok_or_else(|| "--config requires a file".to_string())?;
            RuntimeConfig::load(Path::new(path)).map(Some)
        }
    }
}

fn print_help(program_name: &str) {
    println!("jackc v{}", env!("CARGO_PKG_VERSION"));
    println!("Compile Jack classes to stack-machine (.vm) files");
    println!();
    println!("USAGE:");
    println!("    {} <File.jack>               # Compile one class to File.vm", program_name);
    println!("    {} <directory> [options]     # Compile every .jack file in a directory", program_name);
    println!();
    println!("OPTIONS:");
    println!("    --help              Show this help message");
    println!("    --sequential        Compile on the calling thread only");
    println!("    --threads N         Maximum worker threads");
    println!("    --max-files N       Compile at most N files (sorted by name)");
    println!("    --fail-fast         Stop scheduling files after the first failure");
    println!("    --quiet             Suppress per-file progress lines");
    println!("    --config FILE       Read preferences from a TOML file");
    println!();
    println!("ENVIRONMENT:");
    println!("    JACK_LOGGING_MIN_LEVEL      error | warn | info | debug");
    println!("    JACK_LOGGING_USE_STRUCTURED true for JSON log lines");
    println!("    JACK_BATCH_MAX_THREADS      default worker thread cap");
    println!();
    println!("Build profile: {}", jack_compiler::config::build_info::source_info());
}

fn parse_batch_options(args: &[String], base: batch::BatchConfig) -> batch::BatchConfig {
    let mut config = batch::BatchConfig {
        progress_reporting: true,
        ..base
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--sequential" => config.max_threads = 1,
            "--threads" => match args.get(i + 1).map(|v| v.parse::<usize>()) {
                Some(Ok(threads)) => {
                    config.max_threads = threads.max(1);
                    i += 1;
                }
                Some(Err(_)) => {
                    eprintln!("Warning: invalid thread count '{}', using default", args[i + 1]);
                    i += 1;
                }
                None => eprintln!("Warning: --threads requires a number"),
            },
            "--max-files" => match args.get(i + 1).map(|v| v.parse::<usize>()) {
                Some(Ok(max_files)) => {
                    config.max_files = Some(max_files);
                    i += 1;
                }
                Some(Err(_)) => {
                    eprintln!("Warning: invalid max files '{}', ignoring", args[i + 1]);
                    i += 1;
                }
                None => eprintln!("Warning: --max-files requires a number"),
            },
            "--fail-fast" => config.fail_fast = true,
            "--quiet" => config.progress_reporting = false,
            "--config" => i += 1,
            other => eprintln!("Warning: unknown option '{}'", other),
        }
        i += 1;
    }

    config
}

fn compile_single_file(file_path: &Path) -> bool {
    let succeeded = match pipeline::process_file(file_path) {
        Ok(result) => {
            let metrics = &result.compiled.metrics;
            println!(
                "Compiled {} -> {} ({} tokens, {} functions, {} commands)",
                file_path.display(),
                result.output_path.display(),
                metrics.token_count,
                metrics.subroutine_count,
                metrics.command_count
            );
            true
        }
        Err(error) => {
            eprintln!("FAILED: {}", file_path.display());
            print_detailed_error(file_path, &error);
            false
        }
    };

    logging::print_cargo_style_summary();
    succeeded
}

fn compile_directory(dir_path: &Path, config: &batch::BatchConfig) -> bool {
    println!(
        "Compiling {} ({} threads, fail_fast={})",
        dir_path.display(),
        config.max_threads,
        config.fail_fast
    );

    let succeeded = match batch::process_directory_with_config(dir_path, config) {
        Ok(results) => {
            print_batch_results(&results);
            results.failure_count() == 0
        }
        Err(error) => {
            eprintln!("Batch compilation failed: {}", error);
            false
        }
    };

    logging::print_cargo_style_summary();
    succeeded
}

fn print_batch_results(results: &batch::BatchResults) {
    println!();
    println!("{}", results.summary());

    let total_tokens: usize = results
        .successful_files
        .iter()
        .map(|(_, result)| result.compiled.metrics.token_count)
        .sum();
    let seconds = results.processing_duration.as_secs_f64();
    if seconds > 0.0 && total_tokens > 0 {
        println!("  Rate: {:.0} tokens/sec", total_tokens as f64 / seconds);
    }

    if results.failure_count() > 0 {
        println!("\nFailed files:");
        for (file_path, error) in &results.failed_files {
            println!(
                "  {}: [{}] {} error",
                file_path.display(),
                error.error_code().as_str(),
                error.stage()
            );
        }
    }
}

fn print_detailed_error(file_path: &Path, error: &pipeline::PipelineError) {
    let code = error.error_code();
    if let (Some(span), Ok(source)) = (error.span(), fs::read_to_string(file_path)) {
        let map = SourceMap::new(file_path.display().to_string(), source);
        eprint!("{}", map.render(span, &error.to_string()));
    }
    eprintln!("  {} stage: {}", error.stage(), error);
    eprintln!(
        "  [{}] {}: {}",
        code.as_str(),
        logging::codes::get_severity(code.as_str()).as_str(),
        logging::codes::get_action(code.as_str())
    );
}
