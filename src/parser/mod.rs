mod expr;
mod jsblock;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use crate::ast::{
    AstContext, Block, CatchClause, DecTarget, EnumMember, Expr, ExprKind, MatchArm, PatternProp,
    Program, Stmt, StmtKind,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::intern::{Interner, Symbol};
use crate::token::{Pos, Token, TokenKind};

pub(crate) type ParseResult<T> = Result<T, Diagnostic>;

/// Precedence-climbing parser. Tracks two flow-sensitive sets while
/// building the AST: roots bound via `dec` (immutability guard) and
/// secret-tainted names (JS-block console check).
pub struct Parser<'a, 'i> {
    tokens: Vec<Token>,
    current: usize,
    pub(super) interner: &'i mut Interner,
    ctx: AstContext<'a>,
    immutable: Vec<HashSet<Symbol>>,
    secrets: Vec<HashSet<Symbol>>,
    /// Set while parsing a pattern guard; the bitwise-or level never
    /// consumes `|` under it.
    in_guard: bool,
    /// One-shot flag raised at statement head; `name >> f g` is a flow
    /// only there.
    flow_ok: bool,
}

impl<'a, 'i> Parser<'a, 'i> {
    pub fn new(tokens: Vec<Token>, interner: &'i mut Interner, ctx: AstContext<'a>) -> Self {
        Parser {
            tokens,
            current: 0,
            interner,
            ctx,
            immutable: vec![HashSet::new()],
            secrets: vec![HashSet::new()],
            in_guard: false,
            flow_ok: false,
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program<'a>> {
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.at(TokenKind::Eof) {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { body })
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek_ahead(&self, n: usize) -> &Token {
        &self.tokens[(self.current + n).min(self.tokens.len() - 1)]
    }

    pub(super) fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(super) fn pos(&self) -> Pos {
        self.peek().pos
    }

    pub(super) fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = *self.peek();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {}, found {}",
                what,
                self.describe_current()
            )))
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.advance();
        }
    }

    fn describe_current(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            _ => format!("'{}'", self.interner.resolve(token.lexeme)),
        }
    }

    pub(super) fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        let token = self.peek();
        Diagnostic::new(DiagnosticKind::Parse, token.pos, message).with_span(token.span)
    }

    pub(super) fn error_at(&self, pos: Pos, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parse, pos, message)
    }

    fn end_statement(&mut self) -> ParseResult<()> {
        match self.kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::RBrace => Ok(()),
            _ => Err(self.error_here(format!(
                "expected end of statement, found {}",
                self.describe_current()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Scope tracking
    // ------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.immutable.push(HashSet::new());
        self.secrets.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.immutable.pop();
        self.secrets.pop();
    }

    fn declare_immutable(&mut self, name: Symbol) {
        if let Some(scope) = self.immutable.last_mut() {
            scope.insert(name);
        }
    }

    pub(super) fn is_immutable(&self, name: Symbol) -> bool {
        self.immutable.iter().rev().any(|scope| scope.contains(&name))
    }

    fn declare_secret(&mut self, name: Symbol) {
        if let Some(scope) = self.secrets.last_mut() {
            scope.insert(name);
        }
    }

    pub(super) fn is_secret(&self, name: Symbol) -> bool {
        self.secrets.iter().rev().any(|scope| scope.contains(&name))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<Stmt<'a>> {
        match self.kind() {
            TokenKind::Expose => self.parse_modified(),
            TokenKind::Secret => self.parse_modified(),
            TokenKind::Dec => self.parse_dec(false, false),
            TokenKind::Fn | TokenKind::Memo | TokenKind::Async => self.parse_function(false),
            TokenKind::Enum => self.parse_enum(false),
            TokenKind::Arg => self.parse_arg_env(true, false),
            TokenKind::Env => self.parse_arg_env(false, false),
            TokenKind::As => self.parse_dep(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let pos = self.advance().pos;
                self.end_statement()?;
                Ok(Stmt { kind: StmtKind::Break, pos })
            }
            TokenKind::Continue => {
                let pos = self.advance().pos;
                self.end_statement()?;
                Ok(Stmt { kind: StmtKind::Continue, pos })
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Test => self.parse_test_block(false),
            TokenKind::Describe => self.parse_test_block(true),
            TokenKind::Expect => self.parse_expect(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::LBrace => {
                let pos = self.pos();
                let body = self.parse_block()?;
                Ok(Stmt { kind: StmtKind::Block(body), pos })
            }
            TokenKind::Bar if self.guard_ahead(self.current) => self.parse_pattern_match(false),
            TokenKind::Regex { .. } if self.regex_arm_ahead() => self.parse_pattern_match(true),
            _ => self.parse_expression_statement(),
        }
    }

    /// `expose` / `secret` prefixes. `secret` is only valid on `dec`,
    /// `env`, or `arg`; `expose` on `dec`, `fn`, or `enum`.
    fn parse_modified(&mut self) -> ParseResult<Stmt<'a>> {
        let mut exposed = false;
        let mut secret = false;
        let start = self.pos();
        loop {
            match self.kind() {
                TokenKind::Expose if !exposed => {
                    exposed = true;
                    self.advance();
                }
                TokenKind::Secret if !secret => {
                    secret = true;
                    self.advance();
                }
                _ => break,
            }
        }
        match self.kind() {
            TokenKind::Dec => self.parse_dec(exposed, secret),
            TokenKind::Arg if !exposed => self.parse_arg_env(true, secret),
            TokenKind::Env if !exposed => self.parse_arg_env(false, secret),
            TokenKind::Fn | TokenKind::Memo | TokenKind::Async if !secret => {
                self.parse_function(exposed)
            }
            TokenKind::Enum if !secret => self.parse_enum(exposed),
            _ => Err(self.error_at(
                start,
                if secret {
                    "'secret' is only valid on 'dec', 'env', or 'arg' declarations"
                } else {
                    "'expose' must precede a declaration"
                },
            )),
        }
    }

    fn parse_dec(&mut self, exposed: bool, secret: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let target = match self.kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                DecTarget::Name(name)
            }
            TokenKind::LBrace => self.parse_object_pattern()?,
            TokenKind::LBracket => self.parse_array_pattern()?,
            _ => {
                return Err(self.error_here(format!(
                    "expected name or destructure pattern after 'dec', found {}",
                    self.describe_current()
                )))
            }
        };
        if !self.eat(TokenKind::Eq) {
            return Err(self.error_here("'dec' requires an initializer"));
        }
        let init = self.parse_initializer()?;
        for name in target.bound_names() {
            self.declare_immutable(name);
            if secret {
                self.declare_secret(name);
            }
        }
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Dec { target, init, exposed, secret },
            pos,
        })
    }

    fn parse_object_pattern(&mut self) -> ParseResult<DecTarget> {
        self.advance();
        let mut props = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBrace) {
                break;
            }
            let key = self.expect_identifier("property name in destructure pattern")?;
            let binding = if self.eat(TokenKind::Colon) {
                self.expect_identifier("binding name after ':'")?
            } else {
                key
            };
            props.push(PatternProp { key, binding });
            self.skip_newlines();
            if !self.eat(TokenKind::Comma) {
                self.skip_newlines();
                self.expect(TokenKind::RBrace, "'}' closing destructure pattern")?;
                break;
            }
        }
        Ok(DecTarget::Object(props))
    }

    /// Array patterns allow holes: `[a, , b]`.
    fn parse_array_pattern(&mut self) -> ParseResult<DecTarget> {
        self.advance();
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    elements.push(None);
                }
                TokenKind::Identifier(name) => {
                    self.advance();
                    elements.push(Some(name));
                    if !self.eat(TokenKind::Comma) {
                        self.skip_newlines();
                        self.expect(TokenKind::RBracket, "']' closing destructure pattern")?;
                        break;
                    }
                }
                _ => {
                    return Err(self.error_here(format!(
                        "invalid destructure element {}",
                        self.describe_current()
                    )))
                }
            }
        }
        Ok(DecTarget::Array(elements))
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<Symbol> {
        match self.kind() {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(sym)
            }
            _ => Err(self.error_here(format!(
                "expected {}, found {}",
                what,
                self.describe_current()
            ))),
        }
    }

    fn parse_function(&mut self, exposed: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.pos();
        let mut memoized = false;
        let mut is_async = false;
        loop {
            match self.kind() {
                TokenKind::Memo if !memoized => {
                    memoized = true;
                    self.advance();
                }
                TokenKind::Async if !is_async => {
                    is_async = true;
                    self.advance();
                }
                _ => break,
            }
        }
        self.expect(TokenKind::Fn, "'fn'")?;
        let name = self.expect_identifier("function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RParen) {
                break;
            }
            params.push(self.expect_identifier("parameter name")?);
            self.skip_newlines();
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "')' closing parameter list")?;
                break;
            }
        }
        self.skip_newlines();
        let body = self.parse_function_body()?;
        Ok(Stmt {
            kind: StmtKind::Function {
                name,
                params,
                body,
                is_async,
                memoized,
                exposed,
            },
            pos,
        })
    }

    pub(super) fn parse_function_body(&mut self) -> ParseResult<Block<'a>> {
        self.push_scope();
        let result = self.parse_block();
        self.pop_scope();
        result
    }

    pub(super) fn parse_block(&mut self) -> ParseResult<Block<'a>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("expected '}' closing block"));
            }
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.advance();
        Ok(self.ctx.block(stmts))
    }

    fn parse_enum(&mut self, exposed: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let name = self.expect_identifier("enum name")?;
        self.skip_newlines();
        self.expect(TokenKind::LBrace, "'{' after enum name")?;
        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBrace) {
                break;
            }
            let member = self.expect_identifier("enum member name")?;
            let value = if self.eat(TokenKind::Eq) {
                let token = self.advance();
                match token.kind {
                    TokenKind::Number(raw) => {
                        let text = self.interner.resolve(raw);
                        match text.parse::<i64>() {
                            Ok(n) => Some(n),
                            Err(_) => {
                                return Err(self.error_at(
                                    token.pos,
                                    "enum member value must be an integer",
                                ))
                            }
                        }
                    }
                    _ => {
                        return Err(
                            self.error_at(token.pos, "enum member value must be an integer")
                        )
                    }
                }
            } else {
                None
            };
            members.push(EnumMember { name: member, value });
            self.skip_newlines();
            if !self.eat(TokenKind::Comma) {
                self.skip_newlines();
                self.expect(TokenKind::RBrace, "'}' closing enum")?;
                break;
            }
        }
        Ok(Stmt {
            kind: StmtKind::EnumDecl { name, members, exposed },
            pos,
        })
    }

    /// `arg !name = default` / `env NAME`. `!` marks required.
    fn parse_arg_env(&mut self, is_arg: bool, secret: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let required = self.eat(TokenKind::Bang);
        let name = self.expect_identifier(if is_arg { "argument name" } else { "environment variable name" })?;
        let default = if self.eat(TokenKind::Eq) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        if secret {
            self.declare_secret(name);
        }
        self.end_statement()?;
        let kind = if is_arg {
            StmtKind::Arg { name, required, default, secret }
        } else {
            StmtKind::Env { name, required, default, secret }
        };
        Ok(Stmt { kind, pos })
    }

    /// `as alias dep dotted.path` with an optional override object.
    fn parse_dep(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let alias = self.expect_identifier("dependency alias after 'as'")?;
        self.expect(TokenKind::Dep, "'dep'")?;
        let mut path = vec![self.expect_identifier("module path after 'dep'")?];
        while self.eat(TokenKind::Dot) {
            path.push(self.expect_identifier("path segment after '.'")?);
        }
        let overrides = if self.eat(TokenKind::LParen) {
            self.skip_newlines();
            let expr = self.parse_initializer()?;
            self.skip_newlines();
            self.expect(TokenKind::RParen, "')' closing dependency overrides")?;
            Some(expr)
        } else {
            None
        };
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Dep { alias, path, overrides },
            pos,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let test = self.parse_initializer()?;
        self.skip_newlines();
        let consequent = self.parse_block()?;
        self.skip_newlines();
        let alternate = match self.kind() {
            // `elif` is rewritten as `else if`.
            TokenKind::Elif => {
                let stmt = self.parse_if()?;
                Some(self.ctx.alloc_stmt(stmt))
            }
            TokenKind::Else => {
                self.advance();
                self.skip_newlines();
                if self.at(TokenKind::If) {
                    let stmt = self.parse_if()?;
                    Some(self.ctx.alloc_stmt(stmt))
                } else {
                    let else_pos = self.pos();
                    let body = self.parse_block()?;
                    Some(self.ctx.alloc_stmt(Stmt {
                        kind: StmtKind::Block(body),
                        pos: else_pos,
                    }))
                }
            }
            _ => None,
        };
        Ok(Stmt {
            kind: StmtKind::If { test, consequent, alternate },
            pos,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let test = self.parse_initializer()?;
        self.skip_newlines();
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::While { test, body },
            pos,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let binding = self.expect_identifier("loop variable after 'for'")?;
        self.expect(TokenKind::In, "'in'")?;
        let iterable = self.parse_initializer()?;
        self.skip_newlines();
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::ForIn { binding, iterable, body },
            pos,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let value = match self.kind() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.parse_initializer()?),
        };
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Return(value),
            pos,
        })
    }

    fn parse_try(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        self.skip_newlines();
        let block = self.parse_block()?;
        self.skip_newlines();
        let handler = if self.eat(TokenKind::Catch) {
            let param = if self.eat(TokenKind::LParen) {
                let name = self.expect_identifier("catch parameter")?;
                self.expect(TokenKind::RParen, "')' after catch parameter")?;
                Some(name)
            } else {
                None
            };
            self.skip_newlines();
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        self.skip_newlines();
        let finalizer = if self.eat(TokenKind::Finally) {
            self.skip_newlines();
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_at(pos, "expected 'catch' or 'finally' after try block"));
        }
        Ok(Stmt {
            kind: StmtKind::Try { block, handler, finalizer },
            pos,
        })
    }

    fn parse_throw(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let value = self.parse_initializer()?;
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Throw(value),
            pos,
        })
    }

    fn parse_print(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let mut args = vec![self.parse_initializer()?];
        while self.eat(TokenKind::Comma) {
            args.push(self.parse_initializer()?);
        }
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Print(args),
            pos,
        })
    }

    fn parse_test_block(&mut self, describe: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let name = match self.kind() {
            TokenKind::Str(sym) => {
                self.advance();
                sym
            }
            _ => {
                return Err(self.error_here(format!(
                    "expected {} name string, found {}",
                    if describe { "describe" } else { "test" },
                    self.describe_current()
                )))
            }
        };
        self.skip_newlines();
        let body = self.parse_block()?;
        let kind = if describe {
            StmtKind::DescribeBlock { name, body }
        } else {
            StmtKind::TestBlock { name, body }
        };
        Ok(Stmt { kind, pos })
    }

    /// `expect actual matcher expected?` — e.g. `expect sum toEqual 5`.
    fn parse_expect(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let actual = self.parse_initializer()?;
        let matcher = self.expect_identifier("matcher name")?;
        let expected = match self.kind() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.parse_initializer()?),
        };
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::ExpectStmt { actual, matcher, expected },
            pos,
        })
    }

    fn parse_assert(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.advance().pos;
        let test = self.parse_initializer()?;
        let message = if self.eat(TokenKind::Comma) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::AssertStmt { test, message },
            pos,
        })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt<'a>> {
        let pos = self.pos();
        self.flow_ok = true;
        let expr = self.parse_expression();
        self.flow_ok = false;
        let expr = expr?;
        self.end_statement()?;
        Ok(Stmt {
            kind: StmtKind::Expression(expr),
            pos,
        })
    }

    // ------------------------------------------------------------------
    // Pattern matching
    // ------------------------------------------------------------------

    /// Bounded lookahead from a `|`: guard iff a second `|` appears before
    /// the end of the line, followed (newlines skipped) by `=>`.
    pub(super) fn guard_ahead(&self, from: usize) -> bool {
        if self.tokens[from.min(self.tokens.len() - 1)].kind != TokenKind::Bar {
            return false;
        }
        let mut i = from + 1;
        loop {
            match self.tokens.get(i).map(|t| t.kind) {
                None | Some(TokenKind::Eof) | Some(TokenKind::Newline) | Some(TokenKind::Semicolon) => {
                    return false
                }
                Some(TokenKind::Bar) => break,
                Some(_) => i += 1,
            }
        }
        i += 1;
        while matches!(self.tokens.get(i).map(|t| t.kind), Some(TokenKind::Newline)) {
            i += 1;
        }
        matches!(self.tokens.get(i).map(|t| t.kind), Some(TokenKind::FatArrow))
    }

    fn regex_arm_ahead(&self) -> bool {
        matches!(self.kind(), TokenKind::Regex { .. })
            && self.peek_ahead(1).kind == TokenKind::FatArrow
    }

    fn parse_pattern_match(&mut self, is_regex: bool) -> ParseResult<Stmt<'a>> {
        let pos = self.pos();
        let mut arms = Vec::new();
        loop {
            let guard = if is_regex {
                let token = self.advance();
                match token.kind {
                    TokenKind::Regex { pattern, flags } => {
                        self.ctx.expr(ExprKind::Regex { pattern, flags }, token.pos)
                    }
                    _ => return Err(self.error_at(token.pos, "expected regex guard")),
                }
            } else {
                self.expect(TokenKind::Bar, "'|' opening pattern guard")?;
                self.in_guard = true;
                let guard = self.parse_ternary();
                self.in_guard = false;
                let guard = guard?;
                self.expect(TokenKind::Bar, "'|' closing pattern guard")?;
                guard
            };
            self.skip_newlines();
            self.expect(TokenKind::FatArrow, "'=>' after pattern guard")?;
            self.skip_newlines();
            let body = if self.at(TokenKind::LBrace) {
                self.parse_block()?
            } else {
                let stmt = self.parse_statement()?;
                self.ctx.block(vec![stmt])
            };
            arms.push(MatchArm { guard, body });
            self.skip_newlines();
            let more = if is_regex {
                self.regex_arm_ahead()
            } else {
                self.at(TokenKind::Bar) && self.guard_ahead(self.current)
            };
            if !more {
                break;
            }
        }
        Ok(Stmt {
            kind: StmtKind::PatternMatch { arms, is_regex },
            pos,
        })
    }

    // ------------------------------------------------------------------
    // Shared expression entry points (bodies live in expr.rs)
    // ------------------------------------------------------------------

    /// Initializer / condition position: full expression minus assignment
    /// and flow.
    pub(super) fn parse_initializer(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.parse_ternary()
    }

    pub(super) fn context(&self) -> AstContext<'a> {
        self.ctx
    }
}
