//! The code generator (§4.4): parse tree → VM command stream.

use stackforge_bytecode::{ArithmeticOp, Segment, VmCommand};
use stackforge_core::{Keyword, Node, NonTerminalKind, Symbol, SymbolKind, SymbolTable, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CodeGenError {
    #[error("line {line}: '{name}' is already defined in this scope")]
    DuplicateSymbol { name: String, line: u32 },
    #[error("line {line}: undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String, line: u32 },
    #[error("line {line}: 'return expr;' in a void subroutine")]
    ReturnVoidWithValue { line: u32 },
    #[error("line {line}: 'return;' in a non-void subroutine")]
    ReturnNonVoidMissingValue { line: u32 },
}

impl CodeGenError {
    /// The source line this error points at, for diagnostic rendering.
    pub fn line(&self) -> u32 {
        match self {
            CodeGenError::DuplicateSymbol { line, .. }
            | CodeGenError::UndeclaredIdentifier { line, .. }
            | CodeGenError::ReturnVoidWithValue { line }
            | CodeGenError::ReturnNonVoidMissingValue { line } => *line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug, Clone, Copy)]
enum TableSel {
    Class,
    Subroutine,
}

fn segment_for(kind: SymbolKind) -> Segment {
    match kind {
        SymbolKind::Static => Segment::Static,
        SymbolKind::Field => Segment::This,
        SymbolKind::Arg => Segment::Argument,
        SymbolKind::Var => Segment::Local,
    }
}

fn terminal_text(node: &Node) -> String {
    node.as_terminal()
        .expect("grammar node expected to be a terminal")
        .kind
        .to_string()
}

fn is_comma(node: &Node) -> bool {
    node.as_terminal().is_some_and(|t| t.is_symbol(','))
}

struct CodeGen {
    class_name: String,
    class_table: SymbolTable,
    subroutine_table: SymbolTable,
    field_count: u16,
    if_counter: u32,
    while_counter: u32,
    return_is_void: bool,
    commands: Vec<VmCommand>,
}

impl CodeGen {
    fn new() -> Self {
        Self {
            class_name: String::new(),
            class_table: SymbolTable::new(),
            subroutine_table: SymbolTable::new(),
            field_count: 0,
            if_counter: 0,
            while_counter: 0,
            return_is_void: false,
            commands: Vec::new(),
        }
    }

    fn emit(&mut self, cmd: VmCommand) {
        self.commands.push(cmd);
    }

    fn next_if_label(&mut self) -> u32 {
        let n = self.if_counter;
        self.if_counter += 1;
        n
    }

    fn next_while_label(&mut self) -> u32 {
        let n = self.while_counter;
        self.while_counter += 1;
        n
    }

    fn declare(
        &mut self,
        table: TableSel,
        name_tok: &Token,
        ty: String,
        kind: SymbolKind,
    ) -> Result<Symbol, CodeGenError> {
        let name = name_tok.as_identifier().expect("identifier token").to_owned();
        if self.class_table.lookup(&name).is_some() || self.subroutine_table.lookup(&name).is_some() {
            return Err(CodeGenError::DuplicateSymbol { name, line: name_tok.line });
        }
        Ok(match table {
            TableSel::Class => self.class_table.define(name, ty, kind),
            TableSel::Subroutine => self.subroutine_table.define(name, ty, kind),
        })
    }

    /// Resolves a used identifier: subroutine scope first, then class
    /// scope. Fatal if the name isn't a declared variable.
    fn resolve(&self, tok: &Token) -> Result<Symbol, CodeGenError> {
        let name = tok.as_identifier().expect("identifier token");
        self.lookup(name)
            .ok_or_else(|| CodeGenError::UndeclaredIdentifier { name: name.to_owned(), line: tok.line })
    }

    /// Same lookup as [`Self::resolve`] but non-fatal: callers that treat
    /// "not a variable" as a legal static/class reference use this.
    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.subroutine_table.lookup(name).or_else(|| self.class_table.lookup(name)).cloned()
    }

    fn push_symbol(&mut self, sym: &Symbol) {
        self.emit(VmCommand::Push { segment: segment_for(sym.kind), index: sym.index });
    }

    fn run(&mut self, tree: &Node) -> Result<(), CodeGenError> {
        let children = tree.children();
        let name_tok = children[1].as_terminal().expect("class name");
        self.class_name = name_tok.as_identifier().expect("class name is an identifier").to_owned();

        for child in children {
            if child.kind() == Some(NonTerminalKind::ClassVarDec) {
                self.define_class_var_dec(child)?;
            }
        }
        self.field_count = self.class_table.var_count(SymbolKind::Field);

        for child in children {
            if child.kind() == Some(NonTerminalKind::SubroutineDec) {
                self.compile_subroutine_dec(child)?;
            }
        }
        Ok(())
    }

    fn define_class_var_dec(&mut self, node: &Node) -> Result<(), CodeGenError> {
        let children = node.children();
        let kind = if children[0].as_terminal().unwrap().is_keyword(Keyword::Static) {
            SymbolKind::Static
        } else {
            SymbolKind::Field
        };
        let ty = terminal_text(&children[1]);

        let mut i = 2;
        loop {
            let name_tok = children[i].as_terminal().expect("declared name");
            self.declare(TableSel::Class, name_tok, ty.clone(), kind)?;
            i += 1;
            if children.get(i).is_some_and(|c| is_comma(c)) {
                i += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn define_parameters(&mut self, node: &Node) -> Result<(), CodeGenError> {
        let children = node.children();
        let mut i = 0;
        while i < children.len() {
            let ty = terminal_text(&children[i]);
            let name_tok = children[i + 1].as_terminal().expect("parameter name");
            self.declare(TableSel::Subroutine, name_tok, ty, SymbolKind::Arg)?;
            i += 2;
            if children.get(i).is_some_and(is_comma) {
                i += 1;
            }
        }
        Ok(())
    }

    fn define_var_dec(&mut self, node: &Node) -> Result<(), CodeGenError> {
        let children = node.children();
        let ty = terminal_text(&children[1]);
        let mut i = 2;
        loop {
            let name_tok = children[i].as_terminal().expect("declared name");
            self.declare(TableSel::Subroutine, name_tok, ty.clone(), SymbolKind::Var)?;
            i += 1;
            if children.get(i).is_some_and(is_comma) {
                i += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn compile_subroutine_dec(&mut self, node: &Node) -> Result<(), CodeGenError> {
        self.subroutine_table.reset();
        let children = node.children();

        let kind_tok = children[0].as_terminal().unwrap();
        let subroutine_kind = if kind_tok.is_keyword(Keyword::Constructor) {
            SubroutineKind::Constructor
        } else if kind_tok.is_keyword(Keyword::Function) {
            SubroutineKind::Function
        } else {
            SubroutineKind::Method
        };

        self.return_is_void = children[1].as_terminal().unwrap().is_keyword(Keyword::Void);
        let name = children[2].as_terminal().unwrap().as_identifier().unwrap().to_owned();

        if subroutine_kind == SubroutineKind::Method {
            self.subroutine_table.define("this", self.class_name.clone(), SymbolKind::Arg);
        }

        self.define_parameters(&children[4])?;

        let body_children = children[6].children();
        for child in &body_children[1..body_children.len() - 2] {
            if child.kind() == Some(NonTerminalKind::VarDec) {
                self.define_var_dec(child)?;
            }
        }
        let n_locals = self.subroutine_table.var_count(SymbolKind::Var);

        self.emit(VmCommand::Function { name: format!("{}.{name}", self.class_name), n_locals });

        match subroutine_kind {
            SubroutineKind::Constructor => {
                self.emit(VmCommand::Push { segment: Segment::Constant, index: self.field_count });
                self.emit(VmCommand::Call { name: "Memory.alloc".to_owned(), n_args: 1 });
                self.emit(VmCommand::Pop { segment: Segment::Pointer, index: 0 });
            }
            SubroutineKind::Method => {
                self.emit(VmCommand::Push { segment: Segment::Argument, index: 0 });
                self.emit(VmCommand::Pop { segment: Segment::Pointer, index: 0 });
            }
            SubroutineKind::Function => {}
        }

        let statements = &body_children[body_children.len() - 2];
        self.compile_statements(statements)
    }

    fn compile_statements(&mut self, node: &Node) -> Result<(), CodeGenError> {
        for stmt in node.children() {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, node: &Node) -> Result<(), CodeGenError> {
        match node.kind() {
            Some(NonTerminalKind::LetStatement) => self.compile_let_statement(node.children()),
            Some(NonTerminalKind::IfStatement) => self.compile_if_statement(node.children()),
            Some(NonTerminalKind::WhileStatement) => self.compile_while_statement(node.children()),
            Some(NonTerminalKind::DoStatement) => self.compile_do_statement(node.children()),
            Some(NonTerminalKind::ReturnStatement) => self.compile_return_statement(node.children()),
            _ => unreachable!("a statements node only contains statement non-terminals"),
        }
    }

    fn compile_let_statement(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let name_tok = children[1].as_terminal().unwrap();
        let has_index = children[2].as_terminal().is_some_and(|t| t.is_symbol('['));

        if has_index {
            let sym = self.resolve(name_tok)?;
            self.push_symbol(&sym);
            self.compile_expression(&children[3])?;
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Add));
            self.compile_expression(&children[6])?;
            self.emit(VmCommand::Pop { segment: Segment::Temp, index: 0 });
            self.emit(VmCommand::Pop { segment: Segment::Pointer, index: 1 });
            self.emit(VmCommand::Push { segment: Segment::Temp, index: 0 });
            self.emit(VmCommand::Pop { segment: Segment::That, index: 0 });
        } else {
            self.compile_expression(&children[3])?;
            let sym = self.resolve(name_tok)?;
            self.emit(VmCommand::Pop { segment: segment_for(sym.kind), index: sym.index });
        }
        Ok(())
    }

    fn compile_if_statement(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let n = self.next_if_label();
        let true_label = format!("IF_TRUE_{n}");
        let false_label = format!("IF_FALSE_{n}");
        let end_label = format!("IF_END_{n}");

        self.compile_expression(&children[2])?;
        self.emit(VmCommand::IfGoto(true_label.clone()));
        self.emit(VmCommand::Goto(false_label.clone()));
        self.emit(VmCommand::Label(true_label));
        self.compile_statements(&children[5])?;
        self.emit(VmCommand::Goto(end_label.clone()));
        self.emit(VmCommand::Label(false_label));
        if children.len() > 7 {
            self.compile_statements(&children[9])?;
        }
        self.emit(VmCommand::Label(end_label));
        Ok(())
    }

    fn compile_while_statement(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let n = self.next_while_label();
        let exp_label = format!("WHILE_EXP_{n}");
        let end_label = format!("WHILE_END_{n}");

        self.emit(VmCommand::Label(exp_label.clone()));
        self.compile_expression(&children[2])?;
        self.emit(VmCommand::Arithmetic(ArithmeticOp::Not));
        self.emit(VmCommand::IfGoto(end_label.clone()));
        self.compile_statements(&children[5])?;
        self.emit(VmCommand::Goto(exp_label));
        self.emit(VmCommand::Label(end_label));
        Ok(())
    }

    fn compile_do_statement(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let call_children = &children[1..children.len() - 1];
        self.compile_subroutine_call(call_children)?;
        self.emit(VmCommand::Pop { segment: Segment::Temp, index: 0 });
        Ok(())
    }

    fn compile_return_statement(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let return_tok = children[0].as_terminal().unwrap();
        let has_expr = children.len() == 3;

        if self.return_is_void {
            if has_expr {
                return Err(CodeGenError::ReturnVoidWithValue { line: return_tok.line });
            }
            self.emit(VmCommand::Push { segment: Segment::Constant, index: 0 });
        } else {
            if !has_expr {
                return Err(CodeGenError::ReturnNonVoidMissingValue { line: return_tok.line });
            }
            self.compile_expression(&children[1])?;
        }
        self.emit(VmCommand::Return);
        Ok(())
    }

    fn compile_expression(&mut self, node: &Node) -> Result<(), CodeGenError> {
        let children = node.children();
        self.compile_term(&children[0])?;
        let mut i = 1;
        while i < children.len() {
            let op_tok = children[i].as_terminal().expect("binary operator");
            self.compile_term(&children[i + 1])?;
            self.emit_binary_op(op_tok);
            i += 2;
        }
        Ok(())
    }

    fn emit_binary_op(&mut self, tok: &Token) {
        if tok.is_symbol('+') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Add));
        } else if tok.is_symbol('-') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Sub));
        } else if tok.is_symbol('&') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::And));
        } else if tok.is_symbol('|') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Or));
        } else if tok.is_symbol('<') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Lt));
        } else if tok.is_symbol('>') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Gt));
        } else if tok.is_symbol('=') {
            self.emit(VmCommand::Arithmetic(ArithmeticOp::Eq));
        } else if tok.is_symbol('*') {
            self.emit(VmCommand::Call { name: "Math.multiply".to_owned(), n_args: 2 });
        } else if tok.is_symbol('/') {
            self.emit(VmCommand::Call { name: "Math.divide".to_owned(), n_args: 2 });
        } else {
            unreachable!("parser only admits binary-operator symbols here");
        }
    }

    fn compile_term(&mut self, node: &Node) -> Result<(), CodeGenError> {
        let children = node.children();
        match children.len() {
            1 => self.compile_term_leaf(children[0].as_terminal().expect("term leaf")),
            2 => {
                let op_tok = children[0].as_terminal().expect("unary operator");
                self.compile_term(&children[1])?;
                if op_tok.is_symbol('-') {
                    self.emit(VmCommand::Arithmetic(ArithmeticOp::Neg));
                } else {
                    self.emit(VmCommand::Arithmetic(ArithmeticOp::Not));
                }
                Ok(())
            }
            3 if children[0].as_terminal().is_some_and(|t| t.is_symbol('(')) => {
                self.compile_expression(&children[1])
            }
            4 if children[1].as_terminal().is_some_and(|t| t.is_symbol('[')) => {
                let name_tok = children[0].as_terminal().expect("array variable name");
                let sym = self.resolve(name_tok)?;
                self.push_symbol(&sym);
                self.compile_expression(&children[2])?;
                self.emit(VmCommand::Arithmetic(ArithmeticOp::Add));
                self.emit(VmCommand::Pop { segment: Segment::Pointer, index: 1 });
                self.emit(VmCommand::Push { segment: Segment::That, index: 0 });
                Ok(())
            }
            _ => self.compile_subroutine_call(children),
        }
    }

    fn compile_term_leaf(&mut self, tok: &Token) -> Result<(), CodeGenError> {
        match &tok.kind {
            TokenKind::IntConst(n) => {
                self.emit(VmCommand::Push { segment: Segment::Constant, index: *n });
            }
            TokenKind::StringConst(s) => {
                self.emit(VmCommand::Push { segment: Segment::Constant, index: s.chars().count() as u16 });
                self.emit(VmCommand::Call { name: "String.new".to_owned(), n_args: 1 });
                for ch in s.chars() {
                    self.emit(VmCommand::Push { segment: Segment::Constant, index: ch as u16 });
                    self.emit(VmCommand::Call { name: "String.appendChar".to_owned(), n_args: 2 });
                }
            }
            TokenKind::Keyword(Keyword::True) => {
                self.emit(VmCommand::Push { segment: Segment::Constant, index: 0 });
                self.emit(VmCommand::Arithmetic(ArithmeticOp::Not));
            }
            TokenKind::Keyword(Keyword::False) | TokenKind::Keyword(Keyword::Null) => {
                self.emit(VmCommand::Push { segment: Segment::Constant, index: 0 });
            }
            TokenKind::Keyword(Keyword::This) => {
                self.emit(VmCommand::Push { segment: Segment::Pointer, index: 0 });
            }
            TokenKind::Identifier(_) => {
                let sym = self.resolve(tok)?;
                self.push_symbol(&sym);
            }
            _ => unreachable!("parser restricts a single-child term to these kinds"),
        }
        Ok(())
    }

    /// Lowers a `subroutineCall` production, whichever of its two shapes
    /// it was parsed as (§4.4, "Subroutine call lowering").
    fn compile_subroutine_call(&mut self, children: &[Node]) -> Result<(), CodeGenError> {
        let first_tok = children[0].as_terminal().expect("subroutine call head");
        let first_name = first_tok.as_identifier().expect("identifier").to_owned();
        let qualified = children.get(1).and_then(|n| n.as_terminal()).is_some_and(|t| t.is_symbol('.'));

        if qualified {
            let method_name = children[2].as_terminal().unwrap().as_identifier().unwrap().to_owned();
            let expr_list = &children[4];
            if let Some(sym) = self.lookup(&first_name) {
                self.push_symbol(&sym);
                let n = self.compile_expression_list(expr_list)?;
                self.emit(VmCommand::Call { name: format!("{}.{method_name}", sym.ty), n_args: 1 + n });
            } else {
                let n = self.compile_expression_list(expr_list)?;
                self.emit(VmCommand::Call { name: format!("{first_name}.{method_name}"), n_args: n });
            }
        } else {
            let expr_list = &children[2];
            self.emit(VmCommand::Push { segment: Segment::Pointer, index: 0 });
            let n = self.compile_expression_list(expr_list)?;
            self.emit(VmCommand::Call { name: format!("{}.{first_name}", self.class_name), n_args: 1 + n });
        }
        Ok(())
    }

    fn compile_expression_list(&mut self, node: &Node) -> Result<u16, CodeGenError> {
        let mut count = 0u16;
        for child in node.children() {
            if child.kind() == Some(NonTerminalKind::Expression) {
                self.compile_expression(child)?;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Compiles a `class`-rooted parse tree into its VM command stream.
pub fn compile_class(tree: &Node) -> Result<Vec<VmCommand>, CodeGenError> {
    let mut gen = CodeGen::new();
    gen.run(tree)?;
    Ok(gen.commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::lex, parser::parse};

    fn compile_source(source: &str) -> Vec<VmCommand> {
        let tokens = lex(source).unwrap();
        let tree = parse(&tokens).unwrap();
        compile_class(&tree).unwrap()
    }

    #[test]
    fn void_function_returning_nothing() {
        let commands = compile_source("class Foo { function void main() { return; } }");
        assert_eq!(
            commands,
            vec![
                VmCommand::Function { name: "Foo.main".into(), n_locals: 0 },
                VmCommand::Push { segment: Segment::Constant, index: 0 },
                VmCommand::Return,
            ]
        );
    }

    #[test]
    fn function_returns_its_argument() {
        let commands = compile_source("class Foo { function int id(int x) { return x; } }");
        assert_eq!(
            commands,
            vec![
                VmCommand::Function { name: "Foo.id".into(), n_locals: 0 },
                VmCommand::Push { segment: Segment::Argument, index: 0 },
                VmCommand::Return,
            ]
        );
    }

    #[test]
    fn constructor_allocates_and_assigns_field() {
        let commands =
            compile_source("class P { field int x; constructor P new(int v) { let x = v; return this; } }");
        assert_eq!(
            commands,
            vec![
                VmCommand::Function { name: "P.new".into(), n_locals: 0 },
                VmCommand::Push { segment: Segment::Constant, index: 1 },
                VmCommand::Call { name: "Memory.alloc".into(), n_args: 1 },
                VmCommand::Pop { segment: Segment::Pointer, index: 0 },
                VmCommand::Push { segment: Segment::Argument, index: 0 },
                VmCommand::Pop { segment: Segment::This, index: 0 },
                VmCommand::Push { segment: Segment::Pointer, index: 0 },
                VmCommand::Return,
            ]
        );
    }

    #[test]
    fn method_prologue_binds_this_exactly_once() {
        let commands = compile_source("class Foo { method void touch() { return; } }");
        assert_eq!(commands[1], VmCommand::Push { segment: Segment::Argument, index: 0 });
        assert_eq!(commands[2], VmCommand::Pop { segment: Segment::Pointer, index: 0 });
    }

    #[test]
    fn duplicate_symbol_is_fatal() {
        let tokens = lex("class Foo { field int x; field int x; }").unwrap();
        let tree = parse(&tokens).unwrap();
        assert!(matches!(compile_class(&tree), Err(CodeGenError::DuplicateSymbol { .. })));
    }

    #[test]
    fn return_with_value_in_void_function_is_fatal() {
        let tokens = lex("class Foo { function void f() { return 1; } }").unwrap();
        let tree = parse(&tokens).unwrap();
        assert!(matches!(compile_class(&tree), Err(CodeGenError::ReturnVoidWithValue { .. })));
    }

    #[test]
    fn if_and_while_labels_are_unique_within_a_class() {
        let commands = compile_source(
            "class Foo { function void f() { if (true) { } else { } while (true) { } return; } }",
        );
        let labels: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                VmCommand::Label(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(labels.len(), unique.len());
    }

    #[test]
    fn static_call_on_undeclared_name_is_not_an_error() {
        let commands = compile_source("class Foo { function void f() { do Output.println(); return; } }");
        assert!(commands.contains(&VmCommand::Call { name: "Output.println".into(), n_args: 0 }));
    }
}
