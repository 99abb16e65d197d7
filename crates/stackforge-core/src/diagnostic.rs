//! Fatal-error reporting with source context, via `annotate-snippets`.
//!
//! Every stage in this toolchain treats every error as fatal: there is
//! no recovery, and no partial output is ever left on disk. What varies
//! is how much context is worth showing. The lexer, parser and code
//! generator have a source line to point at, so they render a snippet.
//! The VM translator and assembler work over text that's already once
//! removed from the original source, so they fall back to a plain
//! one-line message.

use std::fmt;

use annotate_snippets::{Level, Renderer, Snippet};

/// A fatal error with enough context to point at the offending line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub origin: Option<String>,
    pub source: Option<SourceContext>,
}

/// The source line a diagnostic points at, and the byte span within it
/// to underline.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub line_text: String,
    pub line_number: usize,
    pub span: std::ops::Range<usize>,
    pub label: String,
}

impl SourceContext {
    /// Builds a context that underlines an entire source line, given its
    /// 1-based line number. The front end only ever locates an error to a
    /// line, not a column, so the whole line is the span.
    pub fn whole_line(source: &str, line_number: u32, label: impl Into<String>) -> Self {
        let line_text = source
            .lines()
            .nth(line_number.saturating_sub(1) as usize)
            .unwrap_or("")
            .to_owned();
        let span = 0..line_text.len();
        Self {
            line_text,
            line_number: line_number as usize,
            span,
            label: label.into(),
        }
    }
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: None,
            source: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = Some(source);
        self
    }

    /// Renders this diagnostic as a human-readable, optionally multi-line
    /// report. Falls back to a single line when there's no source context.
    pub fn render(&self) -> String {
        let Some(ctx) = &self.source else {
            return match &self.origin {
                Some(origin) => format!("error: {} ({origin})", self.message),
                None => format!("error: {}", self.message),
            };
        };

        let mut snippet = Snippet::source(&ctx.line_text)
            .line_start(ctx.line_number)
            .fold(true)
            .annotation(Level::Error.span(ctx.span.clone()).label(&ctx.label));
        if let Some(origin) = &self.origin {
            snippet = snippet.origin(origin);
        }

        let message = Level::Error.title(&self.message).snippet(snippet);
        Renderer::styled().render(message).to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_diagnostic_has_no_snippet() {
        let diag = Diagnostic::new("line 3: boom").with_origin("foo.source");
        assert_eq!(diag.render(), "error: line 3: boom (foo.source)");
    }

    #[test]
    fn whole_line_context_picks_out_the_right_line() {
        let source = "let x = 1;\nlet y = 2;\nlet z = 3;\n";
        let ctx = SourceContext::whole_line(source, 2, "here");
        assert_eq!(ctx.line_text, "let y = 2;");
        assert_eq!(ctx.line_number, 2);
        assert_eq!(ctx.span, 0..ctx.line_text.len());
    }

    #[test]
    fn diagnostic_with_source_renders_a_snippet() {
        let source = "let y = 2;\n";
        let diag = Diagnostic::new("undeclared identifier 'y'")
            .with_origin("foo.source")
            .with_source(SourceContext::whole_line(source, 1, "undeclared identifier 'y'"));
        let rendered = diag.render();
        assert!(rendered.contains("foo.source"));
        assert!(rendered.contains("let y = 2;"));
    }
}
