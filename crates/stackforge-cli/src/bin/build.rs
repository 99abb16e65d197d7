//! `sf-build` — runs the full pipeline: compile, translate, assemble.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use stackforge_asm::assemble;
use stackforge_bytecode::parse_program;
use stackforge_compiler::{compile_source, CompileError};
use stackforge_core::{Diagnostic, SourceContext};
use stackforge_vm::{translate_file, write_bootstrap};

/// Runs the compiler, VM translator, and assembler in sequence over a
/// `.source` file or a directory of them, leaving every intermediate
/// file (`.vm`, `.asm`, `.bin`) alongside the input.
#[derive(Parser)]
#[command(name = "sf-build", bin_name = "sf-build")]
struct Cli {
    /// A `.source` file, or a directory of `.source` files
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
        build_directory(path)
    } else {
        build_single_file(path)
    }
}

fn namespace_of(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("Main").to_owned()
}

fn io_diagnostic(path: &Path, err: &std::io::Error) -> Diagnostic {
    Diagnostic::new(err.to_string()).with_origin(path.display().to_string())
}

fn compile_one(path: &Path) -> Result<PathBuf, Diagnostic> {
    let source = fs::read_to_string(path).map_err(|e| io_diagnostic(path, &e))?;
    let commands = compile_source(&source).map_err(|e| compile_diagnostic(e, &source, path))?;

    let out_path = path.with_extension("vm");
    let text: String = commands.iter().map(|c| format!("{c}\n")).collect();
    fs::write(&out_path, text).map_err(|e| io_diagnostic(&out_path, &e))?;
    Ok(out_path)
}

/// Builds a [`Diagnostic`] for a front-end error, attaching a snippet of
/// the offending line when the error carries one (§7, §10).
fn compile_diagnostic(err: CompileError, source: &str, path: &Path) -> Diagnostic {
    let message = err.to_string();
    let diag = Diagnostic::new(message.clone()).with_origin(path.display().to_string());
    match err.line() {
        Some(line) => diag.with_source(SourceContext::whole_line(source, line, message)),
        None => diag,
    }
}

fn assemble_one(path: &Path) -> Result<PathBuf, Diagnostic> {
    let source = fs::read_to_string(path).map_err(|e| io_diagnostic(path, &e))?;
    let words = assemble(&source)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(path.display().to_string()))?;

    let out_path = path.with_extension("bin");
    let text: String = words.iter().map(|w| format!("{w}\n")).collect();
    fs::write(&out_path, text).map_err(|e| io_diagnostic(&out_path, &e))?;
    Ok(out_path)
}

fn build_single_file(path: &Path) -> Result<(), Diagnostic> {
    let vm_path = compile_one(path)?;

    let source = fs::read_to_string(&vm_path).map_err(|e| io_diagnostic(&vm_path, &e))?;
    let commands = parse_program(&source)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(vm_path.display().to_string()))?;

    let mut lines = Vec::new();
    translate_file(&commands, &namespace_of(&vm_path), &mut lines)
        .map_err(|e| Diagnostic::new(e.to_string()).with_origin(vm_path.display().to_string()))?;

    let asm_path = vm_path.with_extension("asm");
    let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
    fs::write(&asm_path, text).map_err(|e| io_diagnostic(&asm_path, &e))?;

    assemble_one(&asm_path)?;
    Ok(())
}

fn build_directory(dir: &Path) -> Result<(), Diagnostic> {
    let mut source_files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_diagnostic(dir, &e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("source"))
        .collect();
    source_files.sort();

    let mut vm_files = Vec::with_capacity(source_files.len());
    for file in &source_files {
        vm_files.push(compile_one(file)?);
    }

    let mut lines = Vec::new();
    write_bootstrap(&mut lines).map_err(|e| Diagnostic::new(e.to_string()))?;
    for vm_path in &vm_files {
        let source = fs::read_to_string(vm_path).map_err(|e| io_diagnostic(vm_path, &e))?;
        let commands = parse_program(&source)
            .map_err(|e| Diagnostic::new(e.to_string()).with_origin(vm_path.display().to_string()))?;
        translate_file(&commands, &namespace_of(vm_path), &mut lines).map_err(|e| {
            Diagnostic::new(e.to_string()).with_origin(vm_path.display().to_string())
        })?;
    }

    let dir_name = dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("program")
        .to_owned();
    let asm_path = dir.join(format!("{dir_name}.asm"));
    let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
    fs::write(&asm_path, text).map_err(|e| io_diagnostic(&asm_path, &e))?;

    assemble_one(&asm_path)?;
    Ok(())
}
