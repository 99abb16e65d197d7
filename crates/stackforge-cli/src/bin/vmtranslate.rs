//! `sf-vmtranslate` — VM bytecode to symbolic target assembly (§6).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use stackforge_bytecode::parse_program;
use stackforge_core::Diagnostic;
use stackforge_vm::{translate_file, write_bootstrap};

/// Translates `.vm` files to a single `.asm` file.
#[derive(Parser)]
#[command(name = "sf-vmtranslate", bin_name = "sf-vmtranslate")]
struct Cli {
    /// A `.vm` file, or a directory of `.vm` files
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
    if path.is_dir() {
        translate_directory(path)
    } else {
        translate_single_file(path)
    }
}

fn namespace_of(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("Main").to_owned()
}

fn translate_single_file(path: &Path) -> Result<(), Diagnostic> {
    let source = fs::read_to_string(path).map_err(|e| io_diagnostic(path, &e))?;
    let commands = parse_program(&source)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(path.display().to_string()))?;

    let mut lines = Vec::new();
    translate_file(&commands, &namespace_of(path), &mut lines)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(path.display().to_string()))?;

    let out_path = path.with_extension("asm");
    write_lines(&out_path, &lines)
}

/// Translates every `.vm` file in the directory, in lexicographic order,
/// concatenating the result into `<dirbasename>.asm` with a bootstrap
/// prepended (§5, §6).
fn translate_directory(dir: &Path) -> Result<(), Diagnostic> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_diagnostic(dir, &e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("vm"))
        .collect();
    files.sort();

    let mut lines = Vec::new();
    write_bootstrap(&mut lines).map_err(|e| Diagnostic::new(e.to_string()))?;

    for file in &files {
        let source = fs::read_to_string(file).map_err(|e| io_diagnostic(file, &e))?;
        let commands = parse_program(&source)
            .map_err(|e| Diagnostic::new(e.to_string()).with_origin(file.display().to_string()))?;
        translate_file(&commands, &namespace_of(file), &mut lines)
            .map_err(|e| Diagnostic::new(e.to_string()).with_origin(file.display().to_string()))?;
    }

    let dir_name = dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("program")
        .to_owned();
    let out_path = dir.join(format!("{dir_name}.asm"));
    write_lines(&out_path, &lines)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), Diagnostic> {
    let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
    fs::write(path, text).map_err(|e| io_diagnostic(path, &e))
}

fn io_diagnostic(path: &Path, err: &std::io::Error) -> Diagnostic {
    Diagnostic::new(err.to_string()).with_origin(path.display().to_string())
}
