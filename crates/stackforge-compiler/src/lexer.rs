//! The lexer (§4.1): character stream → tagged tokens.
//!
//! Comments are stripped in a manual pre-pass rather than folded into
//! the `logos` grammar as skip patterns, because an *unterminated*
//! block comment has to be a fatal, located error rather than silently
//! falling through to "illegal character" on the stray `/`.

use logos::Logos;

use stackforge_core::{Keyword, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LexError {
    #[error("line {line}: unterminated block comment")]
    UnterminatedBlockComment { line: u32 },
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },
    #[error("line {line}: illegal character '{ch}'")]
    IllegalCharacter { line: u32, ch: char },
    #[error("line {line}: integer literal {value} out of range")]
    IntegerOverflow { line: u32, value: u32 },
}

impl LexError {
    /// The source line this error points at, for diagnostic rendering.
    pub fn line(&self) -> u32 {
        match self {
            LexError::UnterminatedBlockComment { line }
            | LexError::UnterminatedString { line }
            | LexError::IllegalCharacter { line, .. }
            | LexError::IntegerOverflow { line, .. } => *line,
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Lex {
    #[token("class")]
    Class,
    #[token("method")]
    Method,
    #[token("function")]
    Function,
    #[token("constructor")]
    Constructor,
    #[token("int")]
    Int,
    #[token("boolean")]
    Boolean,
    #[token("char")]
    Char,
    #[token("void")]
    Void,
    #[token("var")]
    Var,
    #[token("static")]
    Static,
    #[token("field")]
    Field,
    #[token("let")]
    Let,
    #[token("do")]
    Do,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("this")]
    This,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("=")]
    Equals,
    #[token("~")]
    Tilde,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    IntConst(u32),

    #[regex(r#""[^"\n]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_owned() })]
    StringConst(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

fn convert(lex: Lex) -> TokenKind {
    match lex {
        Lex::Class => TokenKind::Keyword(Keyword::Class),
        Lex::Method => TokenKind::Keyword(Keyword::Method),
        Lex::Function => TokenKind::Keyword(Keyword::Function),
        Lex::Constructor => TokenKind::Keyword(Keyword::Constructor),
        Lex::Int => TokenKind::Keyword(Keyword::Int),
        Lex::Boolean => TokenKind::Keyword(Keyword::Boolean),
        Lex::Char => TokenKind::Keyword(Keyword::Char),
        Lex::Void => TokenKind::Keyword(Keyword::Void),
        Lex::Var => TokenKind::Keyword(Keyword::Var),
        Lex::Static => TokenKind::Keyword(Keyword::Static),
        Lex::Field => TokenKind::Keyword(Keyword::Field),
        Lex::Let => TokenKind::Keyword(Keyword::Let),
        Lex::Do => TokenKind::Keyword(Keyword::Do),
        Lex::If => TokenKind::Keyword(Keyword::If),
        Lex::Else => TokenKind::Keyword(Keyword::Else),
        Lex::While => TokenKind::Keyword(Keyword::While),
        Lex::Return => TokenKind::Keyword(Keyword::Return),
        Lex::True => TokenKind::Keyword(Keyword::True),
        Lex::False => TokenKind::Keyword(Keyword::False),
        Lex::Null => TokenKind::Keyword(Keyword::Null),
        Lex::This => TokenKind::Keyword(Keyword::This),
        Lex::LBrace => TokenKind::Symbol('{'),
        Lex::RBrace => TokenKind::Symbol('}'),
        Lex::LParen => TokenKind::Symbol('('),
        Lex::RParen => TokenKind::Symbol(')'),
        Lex::LBracket => TokenKind::Symbol('['),
        Lex::RBracket => TokenKind::Symbol(']'),
        Lex::Dot => TokenKind::Symbol('.'),
        Lex::Comma => TokenKind::Symbol(','),
        Lex::Semi => TokenKind::Symbol(';'),
        Lex::Plus => TokenKind::Symbol('+'),
        Lex::Minus => TokenKind::Symbol('-'),
        Lex::Star => TokenKind::Symbol('*'),
        Lex::Slash => TokenKind::Symbol('/'),
        Lex::Amp => TokenKind::Symbol('&'),
        Lex::Pipe => TokenKind::Symbol('|'),
        Lex::LAngle => TokenKind::Symbol('<'),
        Lex::RAngle => TokenKind::Symbol('>'),
        Lex::Equals => TokenKind::Symbol('='),
        Lex::Tilde => TokenKind::Symbol('~'),
        Lex::IntConst(n) => TokenKind::IntConst(n as u16),
        Lex::StringConst(s) => TokenKind::StringConst(s),
        Lex::Ident(s) => TokenKind::Identifier(s),
    }
}

/// Removes line (`// ...`) and block (`/* ... */`) comments, preserving
/// every newline so downstream line numbers still refer to the original
/// source.
fn strip_comments(source: &str) -> Result<String, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut line = 1u32;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            out.push('\n');
            line += 1;
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            i += 2;
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            i += 2;
            let mut closed = false;
            while i < chars.len() {
                if chars[i] == '\n' {
                    out.push('\n');
                    line += 1;
                    i += 1;
                    continue;
                }
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    closed = true;
                    break;
                }
                i += 1;
            }
            if !closed {
                return Err(LexError::UnterminatedBlockComment { line: start_line });
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    Ok(out)
}

/// Lexes a full source file into its token stream.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let cleaned = strip_comments(source)?;
    let mut lexer = Lex::lexer(&cleaned);
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut scanned = 0usize;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += cleaned[scanned..span.start].matches('\n').count() as u32;
        scanned = span.start;

        match result {
            Ok(Lex::IntConst(n)) if n > 32767 => {
                return Err(LexError::IntegerOverflow { line, value: n });
            }
            Ok(lex_tok) => tokens.push(Token::new(convert(lex_tok), line)),
            Err(()) => {
                let slice = lexer.slice();
                if slice.starts_with('"') {
                    return Err(LexError::UnterminatedString { line });
                }
                return Err(LexError::IllegalCharacter {
                    line,
                    ch: slice.chars().next().unwrap_or('\0'),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_symbols() {
        assert_eq!(
            kinds("class Foo { }"),
            vec![
                TokenKind::Keyword(Keyword::Class),
                TokenKind::Identifier("Foo".into()),
                TokenKind::Symbol('{'),
                TokenKind::Symbol('}'),
            ]
        );
    }

    #[test]
    fn lexes_int_and_string_literals() {
        assert_eq!(
            kinds(r#"42 "hi there""#),
            vec![TokenKind::IntConst(42), TokenKind::StringConst("hi there".into())]
        );
    }

    #[test]
    fn strips_line_and_block_comments_and_tracks_lines() {
        let tokens = lex("// header\nlet /* inline */ x = 1;\ny").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Let));
        assert_eq!(tokens[0].line, 2);
        let y = tokens.last().unwrap();
        assert_eq!(y.kind, TokenKind::Identifier("y".into()));
        assert_eq!(y.line, 3);
    }

    #[test]
    fn reports_unterminated_block_comment() {
        let err = lex("x /* never closed").unwrap_err();
        assert_eq!(err, LexError::UnterminatedBlockComment { line: 1 });
    }

    #[test]
    fn reports_unterminated_string() {
        let err = lex("\"oops").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 1 });
    }

    #[test]
    fn accepts_the_maximum_literal_and_rejects_one_past_it() {
        assert_eq!(kinds("32767"), vec![TokenKind::IntConst(32767)]);
        let err = lex("32768").unwrap_err();
        assert_eq!(err, LexError::IntegerOverflow { line: 1, value: 32768 });
    }
}
