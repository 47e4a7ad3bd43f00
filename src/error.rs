use std::fmt;

use console::style;
use serde::Serialize;
use thiserror::Error;

use crate::token::{Pos, Span};

/// Diagnostic families, in pipeline order. The kind decides the label in
/// the user-visible `Kind at L:C: message` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    Scan,
    Parse,
    Type,
    Lint,
    Compile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Scan => "ScanError",
            DiagnosticKind::Parse => "ParseError",
            DiagnosticKind::Type => "TypeError",
            DiagnosticKind::Lint => "LintError",
            DiagnosticKind::Compile => "CompileError",
        };
        f.write_str(label)
    }
}

/// Uniform error record produced by every pass.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: u32,
    pub column: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, pos: Pos, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            line: pos.line,
            column: pos.column,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    /// Render the diagnostic against its source text: the offending line,
    /// a caret underline sized to the span, and the one-line summary.
    pub fn display_with_source(&self, source: &str) -> String {
        let one_liner = self.to_string();
        let span = match self.span {
            Some(span) if span.start <= source.len() => span,
            _ => return one_liner,
        };

        let (line_start, line_content) = line_containing(source, span.start);
        let col = span.start.saturating_sub(line_start);
        let len = (span.end.saturating_sub(span.start)).max(1).min(line_content.len().saturating_sub(col).max(1));
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));

        format!(
            "{}: {}\n\n{} {} {}\n     {} {}",
            style("error").red().bold(),
            one_liner,
            style(format!("{:4}", self.line)).blue(),
            style("|").blue(),
            line_content,
            style("|").blue(),
            style(underline).red(),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.kind, self.line, self.column, self.message
        )
    }
}

fn line_containing(source: &str, offset: usize) -> (usize, &str) {
    let mut line_start = 0;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_start = i + 1;
        }
    }
    let line_end = source[line_start..]
        .find('\n')
        .map(|off| line_start + off)
        .unwrap_or(source.len());
    (line_start, &source[line_start..line_end])
}

/// The ordered diagnostic batch a failed compile returns.
#[derive(Debug, Clone, Error)]
#[error("{}", format_batch(.diagnostics))]
pub struct CompileFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        CompileFailure { diagnostics }
    }

    pub fn single(diagnostic: Diagnostic) -> Self {
        CompileFailure {
            diagnostics: vec![diagnostic],
        }
    }
}

/// One diagnostic per line, `Kind at L:C: message`.
pub fn format_batch(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Machine-readable form for editor tooling.
pub fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::Parse,
            Pos::new(2, 5),
            "unexpected token '}'",
        )
    }

    #[test]
    fn display_follows_contract_format() {
        assert_eq!(
            sample().to_string(),
            "ParseError at 2:5: unexpected token '}'"
        );
    }

    #[test]
    fn batch_renders_one_per_line() {
        let batch = vec![sample(), sample()];
        let rendered = format_batch(&batch);
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn display_with_source_underlines_the_span() {
        let source = "dec a = 1\ndec b = $\n";
        let diag = Diagnostic::new(DiagnosticKind::Scan, Pos::new(2, 9), "disallowed character '$'")
            .with_span(Span::new(18, 19));
        let rendered = diag.display_with_source(source);
        assert!(rendered.contains("dec b = $"), "{rendered}");
        assert!(rendered.contains('^'), "{rendered}");
    }

    #[test]
    fn display_without_span_falls_back_to_one_liner() {
        let rendered = sample().display_with_source("anything");
        assert_eq!(rendered, sample().to_string());
    }

    #[test]
    fn json_output_carries_kind_and_position() {
        let json = diagnostics_to_json(&[sample()]);
        assert!(json.contains("\"Parse\""), "{json}");
        assert!(json.contains("\"line\": 2"), "{json}");
    }
}
