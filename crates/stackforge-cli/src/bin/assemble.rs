//! `sf-assemble` — symbolic target assembly to 16-bit binary (§6).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use stackforge_asm::assemble;
use stackforge_core::Diagnostic;

/// Assembles a `.asm` file into a `.bin` file of 16-bit binary words.
#[derive(Parser)]
#[command(name = "sf-assemble", bin_name = "sf-assemble")]
struct Cli {
    /// A `.asm` file
    path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(diag) => {
            eprintln!("{}", diag.render());
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> Result<(), Diagnostic> {
    let source = fs::read_to_string(path).map_err(|e| io_diagnostic(path, &e))?;
    let words = assemble(&source)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(path.display().to_string()))?;

    let out_path = path.with_extension("bin");
    let text: String = words.iter().map(|w| format!("{w}\n")).collect();
    fs::write(&out_path, text).map_err(|e| io_diagnostic(&out_path, &e))
}

fn io_diagnostic(path: &Path, err: &std::io::Error) -> Diagnostic {
    Diagnostic::new(err.to_string()).with_origin(path.display().to_string())
}
