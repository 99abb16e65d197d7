//! The recursive-descent parser (§4.2): a single token of lookahead,
//! no error recovery. Every terminal — including brackets and
//! separators — is preserved as a child node, since the XML dump and
//! the code generator both need the full shape of what was written.

use stackforge_core::{Keyword, Node, NonTerminalKind, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected { line: u32, expected: String, found: String },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
}

impl ParseError {
    /// The source line this error points at, if any — `UnexpectedEof`
    /// has run out of tokens to take a line number from.
    pub fn line(&self) -> Option<u32> {
        match self {
            ParseError::Unexpected { line, .. } => Some(*line),
            ParseError::UnexpectedEof { .. } => None,
        }
    }
}

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn line(&self) -> u32 {
        self.peek().or_else(|| self.tokens.last()).map(|t| t.line).unwrap_or(0)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_error(expected: &str) -> ParseError {
        ParseError::UnexpectedEof { expected: expected.to_owned() }
    }

    fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::Unexpected {
            line: found.line,
            expected: expected.to_owned(),
            found: found.kind.to_string(),
        }
    }

    fn expect_symbol(&mut self, sym: char) -> PResult<Node> {
        let found = self.peek().ok_or_else(|| Self::eof_error(&sym.to_string()))?.clone();
        if found.is_symbol(sym) {
            self.advance();
            Ok(Node::Terminal(found))
        } else {
            Err(self.unexpected(&sym.to_string(), &found))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> PResult<Node> {
        let found = self.peek().ok_or_else(|| Self::eof_error(kw.as_str()))?.clone();
        if found.is_keyword(kw) {
            self.advance();
            Ok(Node::Terminal(found))
        } else {
            Err(self.unexpected(kw.as_str(), &found))
        }
    }

    fn expect_identifier(&mut self) -> PResult<Node> {
        let found = self.peek().ok_or_else(|| Self::eof_error("identifier"))?.clone();
        if found.as_identifier().is_some() {
            self.advance();
            Ok(Node::Terminal(found))
        } else {
            Err(self.unexpected("identifier", &found))
        }
    }

    fn at_symbol(&self, sym: char) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(sym))
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn at_one_of_keywords(&self, kws: &[Keyword]) -> bool {
        kws.iter().any(|k| self.at_keyword(*k))
    }

    /// `'int' | 'boolean' | 'char' | identifier`
    fn parse_type(&mut self) -> PResult<Node> {
        let found = self.peek().cloned().ok_or_else(|| Self::eof_error("type"))?;
        if found.is_keyword(Keyword::Int)
            || found.is_keyword(Keyword::Boolean)
            || found.is_keyword(Keyword::Char)
            || found.as_identifier().is_some()
        {
            self.advance();
            Ok(Node::Terminal(found))
        } else {
            Err(self.unexpected("type", &found))
        }
    }

    pub fn parse_class(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::Class)?);
        children.push(self.expect_identifier()?);
        children.push(self.expect_symbol('{')?);
        while self.at_one_of_keywords(&[Keyword::Static, Keyword::Field]) {
            children.push(self.parse_class_var_dec()?);
        }
        while self.at_one_of_keywords(&[Keyword::Constructor, Keyword::Function, Keyword::Method]) {
            children.push(self.parse_subroutine_dec()?);
        }
        children.push(self.expect_symbol('}')?);
        if let Some(tok) = self.peek() {
            return Err(self.unexpected("end of input", &tok.clone()));
        }
        Ok(Node::non_terminal(NonTerminalKind::Class, children))
    }

    fn parse_class_var_dec(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        let found = self.peek().cloned().ok_or_else(|| Self::eof_error("'static' or 'field'"))?;
        if found.is_keyword(Keyword::Static) {
            children.push(self.expect_keyword(Keyword::Static)?);
        } else {
            children.push(self.expect_keyword(Keyword::Field)?);
        }
        children.push(self.parse_type()?);
        children.push(self.expect_identifier()?);
        while self.at_symbol(',') {
            children.push(self.expect_symbol(',')?);
            children.push(self.expect_identifier()?);
        }
        children.push(self.expect_symbol(';')?);
        Ok(Node::non_terminal(NonTerminalKind::ClassVarDec, children))
    }

    fn parse_subroutine_dec(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        let found = self.peek().cloned().ok_or_else(|| Self::eof_error("subroutine declaration"))?;
        if found.is_keyword(Keyword::Constructor) {
            children.push(self.expect_keyword(Keyword::Constructor)?);
        } else if found.is_keyword(Keyword::Function) {
            children.push(self.expect_keyword(Keyword::Function)?);
        } else {
            children.push(self.expect_keyword(Keyword::Method)?);
        }

        if self.at_keyword(Keyword::Void) {
            children.push(self.expect_keyword(Keyword::Void)?);
        } else {
            children.push(self.parse_type()?);
        }

        children.push(self.expect_identifier()?);
        children.push(self.expect_symbol('(')?);
        children.push(self.parse_parameter_list()?);
        children.push(self.expect_symbol(')')?);
        children.push(self.parse_subroutine_body()?);
        Ok(Node::non_terminal(NonTerminalKind::SubroutineDec, children))
    }

    fn parse_parameter_list(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        if !self.at_symbol(')') {
            children.push(self.parse_type()?);
            children.push(self.expect_identifier()?);
            while self.at_symbol(',') {
                children.push(self.expect_symbol(',')?);
                children.push(self.parse_type()?);
                children.push(self.expect_identifier()?);
            }
        }
        Ok(Node::non_terminal(NonTerminalKind::ParameterList, children))
    }

    fn parse_subroutine_body(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_symbol('{')?);
        while self.at_keyword(Keyword::Var) {
            children.push(self.parse_var_dec()?);
        }
        children.push(self.parse_statements()?);
        children.push(self.expect_symbol('}')?);
        Ok(Node::non_terminal(NonTerminalKind::SubroutineBody, children))
    }

    fn parse_var_dec(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::Var)?);
        children.push(self.parse_type()?);
        children.push(self.expect_identifier()?);
        while self.at_symbol(',') {
            children.push(self.expect_symbol(',')?);
            children.push(self.expect_identifier()?);
        }
        children.push(self.expect_symbol(';')?);
        Ok(Node::non_terminal(NonTerminalKind::VarDec, children))
    }

    fn parse_statements(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        while self.at_one_of_keywords(&[
            Keyword::Let,
            Keyword::If,
            Keyword::While,
            Keyword::Do,
            Keyword::Return,
        ]) {
            children.push(self.parse_statement()?);
        }
        Ok(Node::non_terminal(NonTerminalKind::Statements, children))
    }

    fn parse_statement(&mut self) -> PResult<Node> {
        if self.at_keyword(Keyword::Let) {
            self.parse_let_statement()
        } else if self.at_keyword(Keyword::If) {
            self.parse_if_statement()
        } else if self.at_keyword(Keyword::While) {
            self.parse_while_statement()
        } else if self.at_keyword(Keyword::Do) {
            self.parse_do_statement()
        } else {
            self.parse_return_statement()
        }
    }

    fn parse_let_statement(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::Let)?);
        children.push(self.expect_identifier()?);
        if self.at_symbol('[') {
            children.push(self.expect_symbol('[')?);
            children.push(self.parse_expression()?);
            children.push(self.expect_symbol(']')?);
        }
        children.push(self.expect_symbol('=')?);
        children.push(self.parse_expression()?);
        children.push(self.expect_symbol(';')?);
        Ok(Node::non_terminal(NonTerminalKind::LetStatement, children))
    }

    fn parse_if_statement(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::If)?);
        children.push(self.expect_symbol('(')?);
        children.push(self.parse_expression()?);
        children.push(self.expect_symbol(')')?);
        children.push(self.expect_symbol('{')?);
        children.push(self.parse_statements()?);
        children.push(self.expect_symbol('}')?);
        if self.at_keyword(Keyword::Else) {
            children.push(self.expect_keyword(Keyword::Else)?);
            children.push(self.expect_symbol('{')?);
            children.push(self.parse_statements()?);
            children.push(self.expect_symbol('}')?);
        }
        Ok(Node::non_terminal(NonTerminalKind::IfStatement, children))
    }

    fn parse_while_statement(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::While)?);
        children.push(self.expect_symbol('(')?);
        children.push(self.parse_expression()?);
        children.push(self.expect_symbol(')')?);
        children.push(self.expect_symbol('{')?);
        children.push(self.parse_statements()?);
        children.push(self.expect_symbol('}')?);
        Ok(Node::non_terminal(NonTerminalKind::WhileStatement, children))
    }

    fn parse_do_statement(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::Do)?);
        children.extend(self.parse_subroutine_call()?);
        children.push(self.expect_symbol(';')?);
        Ok(Node::non_terminal(NonTerminalKind::DoStatement, children))
    }

    fn parse_return_statement(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        children.push(self.expect_keyword(Keyword::Return)?);
        if !self.at_symbol(';') {
            children.push(self.parse_expression()?);
        }
        children.push(self.expect_symbol(';')?);
        Ok(Node::non_terminal(NonTerminalKind::ReturnStatement, children))
    }

    fn is_binary_op(tok: &Token) -> bool {
        "+-*/&|<>=".chars().any(|c| tok.is_symbol(c))
    }

    fn parse_expression(&mut self) -> PResult<Node> {
        let mut children = vec![self.parse_term()?];
        while self.peek().is_some_and(Self::is_binary_op) {
            children.push(self.advance().map(Node::Terminal).unwrap());
            children.push(self.parse_term()?);
        }
        Ok(Node::non_terminal(NonTerminalKind::Expression, children))
    }

    fn parse_term(&mut self) -> PResult<Node> {
        let found = self.peek().cloned().ok_or_else(|| Self::eof_error("term"))?;

        match &found.kind {
            TokenKind::IntConst(_) | TokenKind::StringConst(_) => {
                self.advance();
                Ok(Node::non_terminal(NonTerminalKind::Term, vec![Node::Terminal(found)]))
            }
            TokenKind::Keyword(Keyword::True)
            | TokenKind::Keyword(Keyword::False)
            | TokenKind::Keyword(Keyword::Null)
            | TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Node::non_terminal(NonTerminalKind::Term, vec![Node::Terminal(found)]))
            }
            TokenKind::Symbol('(') => {
                let mut children = Vec::new();
                children.push(self.expect_symbol('(')?);
                children.push(self.parse_expression()?);
                children.push(self.expect_symbol(')')?);
                Ok(Node::non_terminal(NonTerminalKind::Term, children))
            }
            TokenKind::Symbol('-') | TokenKind::Symbol('~') => {
                let mut children = Vec::new();
                children.push(self.advance().map(Node::Terminal).unwrap());
                children.push(self.parse_term()?);
                Ok(Node::non_terminal(NonTerminalKind::Term, children))
            }
            TokenKind::Identifier(_) => {
                // Lookahead two tokens to disambiguate varName, varName[expr]
                // and the two subroutineCall shapes.
                let next = self.tokens.get(self.pos + 1);
                if next.is_some_and(|t| t.is_symbol('[')) {
                    let mut children = Vec::new();
                    children.push(self.expect_identifier()?);
                    children.push(self.expect_symbol('[')?);
                    children.push(self.parse_expression()?);
                    children.push(self.expect_symbol(']')?);
                    Ok(Node::non_terminal(NonTerminalKind::Term, children))
                } else if next.is_some_and(|t| t.is_symbol('(') || t.is_symbol('.')) {
                    let children = self.parse_subroutine_call()?;
                    Ok(Node::non_terminal(NonTerminalKind::Term, children))
                } else {
                    self.advance();
                    Ok(Node::non_terminal(NonTerminalKind::Term, vec![Node::Terminal(found)]))
                }
            }
            _ => Err(self.unexpected("term", &found)),
        }
    }

    fn parse_subroutine_call(&mut self) -> PResult<Vec<Node>> {
        let mut children = Vec::new();
        children.push(self.expect_identifier()?);
        if self.at_symbol('.') {
            children.push(self.expect_symbol('.')?);
            children.push(self.expect_identifier()?);
        }
        children.push(self.expect_symbol('(')?);
        children.push(self.parse_expression_list()?);
        children.push(self.expect_symbol(')')?);
        Ok(children)
    }

    fn parse_expression_list(&mut self) -> PResult<Node> {
        let mut children = Vec::new();
        if !self.at_symbol(')') {
            children.push(self.parse_expression()?);
            while self.at_symbol(',') {
                children.push(self.expect_symbol(',')?);
                children.push(self.parse_expression()?);
            }
        }
        Ok(Node::non_terminal(NonTerminalKind::ExpressionList, children))
    }
}

/// Parses a full token stream into a `class`-rooted parse tree.
pub fn parse(tokens: &[Token]) -> PResult<Node> {
    Parser::new(tokens).parse_class()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> Node {
        let tokens = lex(source).unwrap();
        parse(&tokens).unwrap()
    }

    #[test]
    fn parses_empty_class() {
        let tree = parse_source("class Foo { }");
        assert_eq!(tree.kind(), Some(NonTerminalKind::Class));
        assert_eq!(tree.children().len(), 4);
    }

    #[test]
    fn parses_field_declaration_with_multiple_names() {
        let tree = parse_source("class Foo { field int x, y; }");
        let dec = &tree.children()[3];
        assert_eq!(dec.kind(), Some(NonTerminalKind::ClassVarDec));
        // field int x , y ;
        assert_eq!(dec.children().len(), 6);
    }

    #[test]
    fn disambiguates_bareword_call_from_qualified_call() {
        let tree = parse_source("class Foo { function void main() { do bar(); do Foo.baz(); return; } }");
        let body = &tree.children()[3].children()[5];
        let statements = &body.children()[1];
        assert_eq!(statements.children().len(), 3);
    }

    #[test]
    fn rejects_malformed_input() {
        let tokens = lex("class Foo {").unwrap();
        assert!(parse(&tokens).is_err());
    }
}
