use regex::Regex;

use super::{ParseResult, Parser};
use crate::ast::{Expr, ExprKind};
use crate::intern::Interner;
use crate::token::{Token, TokenKind};

const CONSOLE_METHODS: &str = "log|error|warn|info|debug|trace";

impl<'a, 'i> Parser<'a, 'i> {
    /// `js (inputs) { ... }`. The body is tokenized normally by the
    /// scanner; the parser rebuilds readable JS source from the token
    /// lexemes, then screens every secret input against `console.*` use.
    pub(super) fn parse_js_block(&mut self) -> ParseResult<&'a Expr<'a>> {
        let pos = self.advance().pos;
        let mut inputs = Vec::new();
        if self.eat(TokenKind::LParen) {
            loop {
                match self.kind() {
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::Identifier(name) => {
                        self.advance();
                        inputs.push(name);
                    }
                    _ => return Err(self.error_here("expected js input name")),
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::LBrace, "'{' opening js block")?;

        let mut depth = 1usize;
        let mut body_tokens: Vec<Token> = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Eof => return Err(self.error_here("expected '}' closing js block")),
                TokenKind::LBrace => {
                    depth += 1;
                    body_tokens.push(self.advance());
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    body_tokens.push(self.advance());
                }
                _ => {
                    body_tokens.push(self.advance());
                }
            }
        }

        let text = reassemble_js(&body_tokens, self.interner);

        for &input in &inputs {
            if self.is_secret(input) {
                let name = self.interner.resolve(input).to_string();
                if console_leaks_secret(&text, &name) {
                    return Err(self.error_at(
                        pos,
                        format!("secret '{}' must not be passed to console.* inside a js block", name),
                    ));
                }
            }
        }

        let body = self.interner.intern(&text);
        Ok(self.context().expr(ExprKind::JsBlock { inputs, body }, pos))
    }
}

/// Rebuild JS source from token lexemes. Whitespace between tokens is a
/// single space (JS is whitespace-insensitive), newlines survive, and the
/// scanner's `===`/`!==` splits collapse back together.
pub(crate) fn reassemble_js(tokens: &[Token], interner: &Interner) -> String {
    let mut pieces: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let next = tokens.get(i + 1).map(|t| t.kind);
        match token.kind {
            TokenKind::Newline => pieces.push("\n"),
            TokenKind::EqEq if next == Some(TokenKind::Eq) => {
                pieces.push("===");
                i += 1;
            }
            TokenKind::NotEq if next == Some(TokenKind::Eq) => {
                pieces.push("!==");
                i += 1;
            }
            _ => pieces.push(interner.resolve(token.lexeme)),
        }
        i += 1;
    }

    let mut out = String::new();
    for (idx, piece) in pieces.iter().enumerate() {
        if *piece == "\n" {
            out.push('\n');
            continue;
        }
        if idx > 0 && pieces[idx - 1] != "\n" {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

/// True when `name` appears inside a `console.<method>(...)` argument
/// list anywhere in the assembled text.
pub(crate) fn console_leaks_secret(text: &str, name: &str) -> bool {
    let pattern = format!(
        r"console\s*\.\s*({})\s*\([^)]*\b{}\b",
        CONSOLE_METHODS,
        regex::escape(name)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leak_detector_matches_console_methods() {
        assert!(console_leaks_secret("console.log(apiKey)", "apiKey"));
        assert!(console_leaks_secret("console . warn ( 'k:' , apiKey )", "apiKey"));
        assert!(console_leaks_secret("console.debug(prefix, apiKey, suffix)", "apiKey"));
    }

    #[test]
    fn leak_detector_ignores_other_uses() {
        assert!(!console_leaks_secret("send(apiKey)", "apiKey"));
        assert!(!console_leaks_secret("console.log(other)", "apiKey"));
        // Name boundary: `apiKeyHash` is not `apiKey`.
        assert!(!console_leaks_secret("console.log(apiKeyHash)", "apiKey"));
    }
}
