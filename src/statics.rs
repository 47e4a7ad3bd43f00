//! Loader for `.static` data files: a data-only grammar (no executable
//! constructs) compiled to a JavaScript module of `export const` bindings.

use indexmap::IndexMap;

use crate::codegen::js_string_literal;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::token::{Pos, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum StaticLiteral {
    /// Raw textual form, radix preserved.
    Number(String),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticProp {
    pub value: StaticValue,
    pub secret: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Literal(StaticLiteral),
    Array(Vec<StaticValue>),
    Object(IndexMap<String, StaticProp>),
    /// Ordered members with optional explicit values; unvalued members
    /// auto-increment from the last explicit value.
    Enum(Vec<(String, Option<i64>)>),
    /// Local or dotted identifier, resolved at runtime by the host
    /// import graph.
    Reference(Vec<String>),
}

impl StaticValue {
    fn has_secrets(&self) -> bool {
        match self {
            StaticValue::Object(props) => props
                .values()
                .any(|prop| prop.secret || prop.value.has_secrets()),
            StaticValue::Array(values) => values.iter().any(StaticValue::has_secrets),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticDecl {
    pub name: String,
    pub value: StaticValue,
    pub secret: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticDoc {
    pub decls: Vec<StaticDecl>,
}

impl StaticDoc {
    pub fn has_secrets(&self) -> bool {
        self.decls
            .iter()
            .any(|decl| decl.secret || decl.value.has_secrets())
    }
}

/// Parse `.static` source text into its data tree.
pub fn parse_static(text: &str) -> Result<StaticDoc, Diagnostic> {
    let mut interner = Interner::new();
    let tokens = Lexer::new(text, &mut interner).tokenize()?;
    let mut parser = StaticParser {
        tokens,
        current: 0,
        interner: &interner,
    };
    parser.parse_doc()
}

struct StaticParser<'i> {
    tokens: Vec<Token>,
    current: usize,
    interner: &'i Interner,
}

impl<'i> StaticParser<'i> {
    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = *self.peek();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.kind() == TokenKind::Newline {
            self.advance();
        }
    }

    fn error(&self, pos: Pos, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parse, pos, message)
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        let token = self.peek();
        Diagnostic::new(DiagnosticKind::Parse, token.pos, message).with_span(token.span)
    }

    /// Declaration names may collide with language keywords; the lexeme
    /// is authoritative here.
    fn expect_name(&mut self, what: &str) -> Result<String, Diagnostic> {
        let token = *self.peek();
        match token.kind {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(self.interner.resolve(sym).to_string())
            }
            kind if kind.is_keyword() => {
                self.advance();
                Ok(self.interner.resolve(token.lexeme).to_string())
            }
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn parse_doc(&mut self) -> Result<StaticDoc, Diagnostic> {
        let mut decls = Vec::new();
        loop {
            self.skip_newlines();
            if self.kind() == TokenKind::Eof {
                break;
            }
            let secret = self.eat(TokenKind::Secret);
            let name = self.expect_name("declaration name")?;
            let value = self.parse_value()?;
            decls.push(StaticDecl { name, value, secret });
        }
        Ok(StaticDoc { decls })
    }

    fn parse_value(&mut self) -> Result<StaticValue, Diagnostic> {
        let token = *self.peek();
        match token.kind {
            TokenKind::Str(sym) => {
                self.advance();
                Ok(StaticValue::Literal(StaticLiteral::Str(
                    self.interner.resolve(sym).to_string(),
                )))
            }
            TokenKind::Number(sym) => {
                self.advance();
                Ok(StaticValue::Literal(StaticLiteral::Number(
                    self.interner.resolve(sym).to_string(),
                )))
            }
            TokenKind::Minus => {
                self.advance();
                match self.kind() {
                    TokenKind::Number(sym) => {
                        self.advance();
                        Ok(StaticValue::Literal(StaticLiteral::Number(format!(
                            "-{}",
                            self.interner.resolve(sym)
                        ))))
                    }
                    _ => Err(self.error_here("expected number after '-'")),
                }
            }
            TokenKind::True => {
                self.advance();
                Ok(StaticValue::Literal(StaticLiteral::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(StaticValue::Literal(StaticLiteral::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(StaticValue::Literal(StaticLiteral::Null))
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Backtick(sym) => {
                self.advance();
                self.parse_enum_body(self.interner.resolve(sym), token.pos)
            }
            TokenKind::Identifier(sym) => {
                self.advance();
                let mut path = vec![self.interner.resolve(sym).to_string()];
                while self.eat(TokenKind::Dot) {
                    path.push(self.expect_name("path segment after '.'")?);
                }
                Ok(StaticValue::Reference(path))
            }
            _ => Err(self.error_here("expected a static value")),
        }
    }

    fn parse_array(&mut self) -> Result<StaticValue, Diagnostic> {
        self.advance();
        let mut values = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBracket) {
                break;
            }
            values.push(self.parse_value()?);
            // Commas and newlines both separate elements.
            while self.eat(TokenKind::Comma) || self.eat(TokenKind::Newline) {}
            if self.eat(TokenKind::RBracket) {
                break;
            }
            if self.kind() == TokenKind::Eof {
                return Err(self.error_here("expected ']' closing static array"));
            }
        }
        Ok(StaticValue::Array(values))
    }

    fn parse_object(&mut self) -> Result<StaticValue, Diagnostic> {
        self.advance();
        let mut props = IndexMap::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBrace) {
                break;
            }
            let secret = self.eat(TokenKind::Secret);
            let key = self.expect_name("property name")?;
            if !self.eat(TokenKind::Eq) {
                return Err(self.error_here("expected '=' after property name"));
            }
            self.skip_newlines();
            let value = self.parse_value()?;
            props.insert(key, StaticProp { value, secret });
            while self.eat(TokenKind::Comma) || self.eat(TokenKind::Newline) {}
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.kind() == TokenKind::Eof {
                return Err(self.error_here("expected '}' closing static object"));
            }
        }
        Ok(StaticValue::Object(props))
    }

    /// `` Name `MEMBER = value, MEMBER` `` — the backtick body is an enum.
    fn parse_enum_body(&mut self, raw: &str, pos: Pos) -> Result<StaticValue, Diagnostic> {
        let body = raw.trim_matches('`');
        let mut members = Vec::new();
        for entry in body.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('=') {
                Some((name, value)) => {
                    let name = name.trim();
                    let value: i64 = value.trim().parse().map_err(|_| {
                        self.error(pos, format!("enum member '{}' has a non-integer value", name))
                    })?;
                    members.push((name.to_string(), Some(value)));
                }
                None => members.push((entry.to_string(), None)),
            }
        }
        if members.is_empty() {
            return Err(self.error(pos, "enum declaration has no members"));
        }
        Ok(StaticValue::Enum(members))
    }
}

// ----------------------------------------------------------------------
// Code generation side channel
// ----------------------------------------------------------------------

const SECRET_HELPER: &str = r#"class _Secret {
  constructor(value) { this._value = value; }
  toString() { return "********"; }
  valueOf() { return this._value; }
  [Symbol.toPrimitive](hint) { return hint === "string" ? "********" : this._value; }
}
const _secret = (value) => (value instanceof _Secret ? value : new _Secret(value));
"#;

/// Emit the JS module for a parsed `.static` file: header comment, the
/// `_Secret` helper when needed, then one `export const` per declaration.
pub fn generate_static_code(doc: &StaticDoc, module_path: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "// Generated from {}.static by the kimchi compiler. Do not edit.\n",
        module_path
    ));
    if doc.has_secrets() {
        out.push('\n');
        out.push_str(SECRET_HELPER);
    }
    for decl in &doc.decls {
        out.push('\n');
        let rendered = render_value(&decl.value);
        if decl.secret {
            out.push_str(&format!("export const {} = _secret({});\n", decl.name, rendered));
        } else {
            out.push_str(&format!("export const {} = {};\n", decl.name, rendered));
        }
    }
    out
}

fn render_value(value: &StaticValue) -> String {
    match value {
        StaticValue::Literal(StaticLiteral::Number(raw)) => raw.clone(),
        StaticValue::Literal(StaticLiteral::Str(s)) => js_string_literal(s),
        StaticValue::Literal(StaticLiteral::Bool(b)) => b.to_string(),
        StaticValue::Literal(StaticLiteral::Null) => "null".to_string(),
        StaticValue::Array(values) => {
            let rendered: Vec<String> = values.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        StaticValue::Object(props) => {
            let rendered: Vec<String> = props
                .iter()
                .map(|(key, prop)| {
                    let value = render_value(&prop.value);
                    if prop.secret {
                        format!("{}: _secret({})", key, value)
                    } else {
                        format!("{}: {}", key, value)
                    }
                })
                .collect();
            format!("{{ {} }}", rendered.join(", "))
        }
        StaticValue::Enum(members) => {
            let mut next = 0i64;
            let rendered: Vec<String> = members
                .iter()
                .map(|(name, value)| {
                    if let Some(value) = value {
                        next = *value;
                    }
                    let entry = format!("{}: {}", name, next);
                    next += 1;
                    entry
                })
                .collect();
            format!("Object.freeze({{ {} }})", rendered.join(", "))
        }
        StaticValue::Reference(path) => path.join("."),
    }
}
