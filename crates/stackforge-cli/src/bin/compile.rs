//! `sf-compile` — source language to VM bytecode (§6).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use stackforge_compiler::{compile_class, lex, parse, to_xml, CompileError};
use stackforge_core::{Diagnostic, SourceContext};

/// Compiles `.source` files to `.vm` bytecode.
#[derive(Parser)]
#[command(name = "sf-compile", bin_name = "sf-compile")]
struct Cli {
    /// A `.source` file, or a directory of `.source` files
    path: PathBuf,

    /// Also write a pretty-printed `.xml` sibling of the parse tree (§6)
    #[arg(long)]
    dump_xml: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.path, cli.dump_xml) {
        Ok(()) => ExitCode::SUCCESS,
        Err(diag) => {
            eprintln!("{}", diag.render());
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, dump_xml: bool) -> Result<(), Diagnostic> {
    let files = source_files(path)?;
    for file in files {
        compile_one(&file, dump_xml)?;
    }
    Ok(())
}

fn source_files(path: &Path) -> Result<Vec<PathBuf>, Diagnostic> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| io_diagnostic(path, &e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("source"))
            .collect();
        files.sort();
        Ok(files)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn compile_one(path: &Path, dump_xml: bool) -> Result<(), Diagnostic> {
    let source = fs::read_to_string(path).map_err(|e| io_diagnostic(path, &e))?;

    let tokens = lex(&source).map_err(CompileError::from).map_err(|e| compile_diagnostic(e, &source, path))?;
    let tree = parse(&tokens).map_err(CompileError::from).map_err(|e| compile_diagnostic(e, &source, path))?;
    let commands =
        compile_class(&tree).map_err(CompileError::from).map_err(|e| compile_diagnostic(e, &source, path))?;

    let out_path = path.with_extension("vm");
    let text: String = commands.iter().map(|c| format!("{c}\n")).collect();
    fs::write(&out_path, text).map_err(|e| io_diagnostic(&out_path, &e))?;

    if dump_xml {
        let xml_path = path.with_extension("xml");
        fs::write(&xml_path, to_xml(&tree)).map_err(|e| io_diagnostic(&xml_path, &e))?;
    }
    Ok(())
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

fn io_diagnostic(path: &Path, err: &std::io::Error) -> Diagnostic {
    Diagnostic::new(err.to_string()).with_origin(path.display().to_string())
}
