//! Compiler for the stackforge source language: lexer, parser, symbol
//! tables, and code generator (§4.1-§4.4).

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod xml;

pub use codegen::{compile_class, CodeGenError};
pub use error::CompileError;
pub use lexer::{lex, LexError};
pub use parser::{parse, ParseError};
pub use xml::to_xml;

use stackforge_bytecode::VmCommand;

/// Runs the full front end over one source file's text: lex, parse,
/// generate. A convenience entry point for callers that don't need the
/// intermediate token stream or parse tree.
pub fn compile_source(source: &str) -> Result<Vec<VmCommand>, CompileError> {
    let tokens = lex(source)?;
    let tree = parse(&tokens)?;
    Ok(compile_class(&tree)?)
}
