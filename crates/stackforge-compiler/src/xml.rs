//! Optional debug rendering of a parse tree as pretty-printed XML (§6).

use stackforge_core::{Node, Token, TokenKind};

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn terminal_tag(token: &Token) -> &'static str {
    match &token.kind {
        TokenKind::Keyword(_) => "keyword",
        TokenKind::Symbol(_) => "symbol",
        TokenKind::Identifier(_) => "identifier",
        TokenKind::IntConst(_) => "integerConstant",
        TokenKind::StringConst(_) => "stringConstant",
    }
}

fn terminal_lexeme(token: &Token) -> String {
    match &token.kind {
        TokenKind::Keyword(k) => k.as_str().to_owned(),
        TokenKind::Symbol(c) => c.to_string(),
        TokenKind::Identifier(s) => s.clone(),
        TokenKind::IntConst(n) => n.to_string(),
        TokenKind::StringConst(s) => s.clone(),
    }
}

fn write_node(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Terminal(token) => {
            let tag = terminal_tag(token);
            out.push_str(&indent);
            out.push_str(&format!("<{tag}> {} </{tag}>\n", escape(&terminal_lexeme(token))));
        }
        Node::NonTerminal { kind, children } => {
            let tag = kind.tag();
            out.push_str(&indent);
            out.push_str(&format!("<{tag}>\n"));
            for child in children {
                write_node(child, depth + 1, out);
            }
            out.push_str(&indent);
            out.push_str(&format!("</{tag}>\n"));
        }
    }
}

/// Renders a parse tree as indented XML, one element per node.
pub fn to_xml(tree: &Node) -> String {
    let mut out = String::new();
    write_node(tree, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::lex, parser::parse};

    #[test]
    fn renders_empty_class() {
        let tokens = lex("class Foo { }").unwrap();
        let tree = parse(&tokens).unwrap();
        let xml = to_xml(&tree);
        assert!(xml.starts_with("<class>\n"));
        assert!(xml.contains("<keyword> class </keyword>\n"));
        assert!(xml.contains("<identifier> Foo </identifier>\n"));
        assert!(xml.trim_end().ends_with("</class>"));
    }

    #[test]
    fn escapes_string_constants() {
        let tokens = lex(r#"class Foo { function void f() { do g("<a&b>"); return; } }"#).unwrap();
        let tree = parse(&tokens).unwrap();
        let xml = to_xml(&tree);
        assert!(xml.contains("&lt;a&amp;b&gt;"));
    }
}
