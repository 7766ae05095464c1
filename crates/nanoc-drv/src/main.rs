//! The `nanoc` command-line binary.
//!
//! With no file argument the compiler starts an interactive REPL; with one
//! it compiles the file and writes the assembly beside it. Exit codes:
//! 0 on success, 1 on a compilation error, 2 on an I/O failure.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use nanoc_drv::{compile, render_phases, CompileOptions};
use nanoc_gen::Target;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nanoc", version, about = "Compiler for the NanoC language")]
struct Cli {
    /// NanoC source file (`.nc`). Starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Write the assembly here instead of next to the source file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Echo tokens, AST, IR, optimized IR, and assembly to stdout.
    #[arg(long)]
    emit_phases: bool,

    /// Assembly target.
    #[arg(long, value_enum, default_value = "x86_64")]
    target: TargetArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    #[value(name = "x86_64")]
    X86_64,
    #[value(name = "riscv")]
    Riscv,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::X86_64 => Target::X86_64,
            TargetArg::Riscv => Target::RiscV,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = CompileOptions {
        target: cli.target.into(),
        emit_phases: cli.emit_phases,
    };

    let Some(file) = cli.file else {
        return match nanoc_drv::repl::run(&options) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::from(2)
            }
        };
    };

    let source = match fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", file.display());
            return ExitCode::from(2);
        }
    };

    let result = match compile(&source, &options) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    if cli.emit_phases {
        print!("{}", render_phases(&result));
    }

    let out_path = cli
        .output
        .unwrap_or_else(|| file.with_extension("asm"));
    if let Err(err) = fs::write(&out_path, &result.asm) {
        eprintln!("error: cannot write {}: {err}", out_path.display());
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
