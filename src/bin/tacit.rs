//! Command-line entry point: runs source files in order, then drops into
//! the interactive REPL unless suppressed. `clap` derive `Args`, plain
//! `eprintln!` diagnostics, process exit code carrying failure out of
//! `main`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tacit::driver;
use tacit::memory::VmConfig;
use tacit::repl;
use tacit::vm::Vm;

/// Run Tacit source files, then (unless suppressed) start an interactive REPL.
#[derive(Parser)]
struct Cli {
    /// Source files to execute, in order, before entering the REPL.
    files: Vec<PathBuf>,

    /// Skip the REPL after running the given files.
    #[arg(long)]
    no_interactive: bool,

    /// Data stack capacity, in cells.
    #[arg(long, default_value_t = VmConfig::default().stack_cells)]
    stack_cells: usize,

    /// Return stack capacity, in cells.
    #[arg(long, default_value_t = VmConfig::default().rstack_cells)]
    rstack_cells: usize,

    /// Code segment capacity, in bytes.
    #[arg(long, default_value_t = VmConfig::default().code_bytes)]
    code_bytes: usize,

    /// String table capacity, in bytes.
    #[arg(long, default_value_t = VmConfig::default().string_bytes)]
    string_bytes: usize,

    /// Global/dictionary heap capacity, in cells.
    #[arg(long, default_value_t = VmConfig::default().global_cells)]
    global_cells: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = VmConfig {
        stack_cells: cli.stack_cells,
        rstack_cells: cli.rstack_cells,
        code_bytes: cli.code_bytes,
        string_bytes: cli.string_bytes,
        global_cells: cli.global_cells,
    };
    let mut vm = Vm::new(config);

    if !cli.files.is_empty() {
        if let Err(message) = driver::run_files(&mut vm, &cli.files) {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    }

    if cli.no_interactive {
        return ExitCode::SUCCESS;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    match repl::run(&mut vm, stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("io error: {e}");
            ExitCode::FAILURE
        }
    }
}
