//! `hackasm`: assemble, translate, or build a Jack program end to end

use clap::{Parser, Subcommand};
use hack_assembler::toolchain::default_threads;
use hack_assembler::{assemble_file, build};
use jack_compiler::logging;
use jack_vm::project::translate_and_write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hackasm")]
#[command(about = "Hack assembler and Jack toolchain driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a .asm file into .hack
    Assemble {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Translate a .vm file or a directory of them into .asm
    Translate {
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Leave out the bootstrap for directories
        #[arg(long)]
        no_bootstrap: bool,
    },

    /// Compile, translate and assemble a .jack file or directory
    Build {
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Compiler worker threads (defaults to the CPU count)
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    if let Err(err) = logging::init_global_logging() {
        log::warn!("compiler logging unavailable: {}", err);
    }

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Commands::Assemble { input } => assemble_file(input)
            .map(|out| println!("Wrote {}", out.display()))
            .map_err(|err| err.to_string()),
        Commands::Translate {
            input,
            no_bootstrap,
        } => translate_and_write(input, !no_bootstrap)
            .map(|out| println!("Wrote {}", out.display()))
            .map_err(|err| err.to_string()),
        Commands::Build { input, threads } => {
            let threads = threads.unwrap_or_else(default_threads);
            build(input, threads)
                .map(|report| {
                    for vm in &report.vm_files {
                        println!("Compiled {}", vm.display());
                    }
                    println!("Wrote {}", report.asm_file.display());
                    println!(
                        "Wrote {} in {:.2}s",
                        report.hack_file.display(),
                        report.duration.as_secs_f64()
                    );
                })
                .map_err(|err| err.to_string())
        }
    };

    logging::print_cargo_style_summary();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}
