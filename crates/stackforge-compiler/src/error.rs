//! The compiler's unified fatal-error type, spanning all three front-end
//! phases (§7: lexical, syntactic, semantic).

use crate::codegen::CodeGenError;
use crate::lexer::LexError;
use crate::parser::ParseError;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),
}

impl CompileError {
    /// The source line this error points at, if any, for diagnostic
    /// rendering via [`stackforge_core::SourceContext`].
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Lex(e) => Some(e.line()),
            CompileError::Parse(e) => e.line(),
            CompileError::CodeGen(e) => Some(e.line()),
        }
    }
}
