//! `vmtranslator`: `.vm` files to Hack assembly, or run them directly

use clap::Parser;
use jack_vm::interpreter::{Interpreter, DEFAULT_ENTRY, DEFAULT_STEP_LIMIT};
use jack_vm::project::{load_vm_files, translate_and_write};
use jack_vm::Program;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "vmtranslator")]
#[command(about = "Translate stack-machine code to Hack assembly")]
#[command(version)]
struct Cli {
    /// A .vm file, or a directory of .vm files
    #[arg(value_name = "PATH")]
    input: PathBuf,

    /// Leave out the SP=256 / Sys.init bootstrap for directories
    #[arg(long)]
    no_bootstrap: bool,

    /// Execute on the reference interpreter instead of translating
    #[arg(long)]
    run: bool,

    /// Function to start from with --run
    #[arg(long, default_value = DEFAULT_ENTRY)]
    entry: String,

    /// Step limit for --run
    #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
    max_steps: u64,

    /// Print the --run result as JSON
    #[arg(long, requires = "run")]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = if cli.run {
        run(&cli)
    } else {
        translate_and_write(&cli.input, !cli.no_bootstrap)
            .map(|out| println!("Wrote {}", out.display()))
            .map_err(|err| err.to_string())
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let files = load_vm_files(&cli.input).map_err(|err| err.to_string())?;
    let files: Vec<_> = files.into_iter().map(|file| (file.name, file.commands)).collect();
    let program = Program::link(&files).map_err(|err| err.to_string())?;

    let execution = Interpreter::new(&program)
        .with_step_limit(cli.max_steps)
        .run(&cli.entry)
        .map_err(|err| err.to_string())?;

    if cli.json {
        let json = serde_json::to_string_pretty(&execution).map_err(|err| err.to_string())?;
        println!("{}", json);
        return Ok(());
    }

    print!("{}", execution.output);
    if !execution.output.ends_with('\n') && !execution.output.is_empty() {
        println!();
    }
    log::info!(
        "{} returned {} after {} steps",
        cli.entry,
        execution.return_value,
        execution.steps
    );
    Ok(())
}
