use super::{ParseResult, Parser};
use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, Expr, ExprKind, MemberProp, ObjectProp, PropKey, UnaryOp,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::intern::{Interner, Symbol};
use crate::lexer::Lexer;
use crate::token::{Pos, TokenKind, MARK_CLOSE, MARK_OPEN};

/// Render an access chain for diagnostics: `obj.foo.bar`, `rows[0].id`.
pub(crate) fn access_path(expr: &Expr<'_>, interner: &Interner) -> String {
    match &expr.kind {
        ExprKind::Identifier(sym) => interner.resolve(*sym).to_string(),
        ExprKind::Member { object, property } => {
            let base = access_path(object, interner);
            match property {
                MemberProp::Name(sym) => format!("{}.{}", base, interner.resolve(*sym)),
                MemberProp::Computed(index) => match &index.kind {
                    ExprKind::Number(sym) => format!("{}[{}]", base, interner.resolve(*sym)),
                    ExprKind::Str(sym) => format!("{}[\"{}\"]", base, interner.resolve(*sym)),
                    ExprKind::Identifier(sym) => format!("{}[{}]", base, interner.resolve(*sym)),
                    _ => format!("{}[…]", base),
                },
            }
        }
        _ => "<expression>".to_string(),
    }
}

impl<'a, 'i> Parser<'a, 'i> {
    pub(super) fn parse_expression(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<&'a Expr<'a>> {
        let left = self.parse_ternary()?;
        let op = match self.kind() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::Add),
            TokenKind::MinusEq => Some(AssignOp::Sub),
            TokenKind::StarEq => Some(AssignOp::Mul),
            TokenKind::SlashEq => Some(AssignOp::Div),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };

        if !matches!(left.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            return Err(self.error_at(left.pos, "invalid assignment target"));
        }
        // Immutability guard: the root of the access chain is what counts.
        if let Some(root) = left.root_identifier() {
            if self.is_immutable(root) {
                let path = access_path(left, self.interner);
                return Err(self.error_at(
                    left.pos,
                    format!("Cannot reassign '{}': bindings declared with 'dec' are immutable", path),
                ));
            }
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(self
            .context()
            .expr(ExprKind::Assign { op, target: left, value }, left.pos))
    }

    pub(super) fn parse_ternary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let test = self.parse_flow()?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_ternary()?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let alternate = self.parse_ternary()?;
        Ok(self.context().expr(
            ExprKind::Conditional { test, consequent, alternate },
            test.pos,
        ))
    }

    /// `name >> f g` is recognized only at statement head with a bare
    /// identifier on the left and an identifier chain on the right; in
    /// every other position `>>` stays a shift.
    fn parse_flow(&mut self) -> ParseResult<&'a Expr<'a>> {
        let flow_ok = std::mem::take(&mut self.flow_ok);
        if flow_ok {
            if let TokenKind::Identifier(target) = self.kind() {
                if self.peek_ahead(1).kind == TokenKind::Shr
                    && matches!(self.peek_ahead(2).kind, TokenKind::Identifier(_))
                {
                    let pos = self.pos();
                    self.advance();
                    self.advance();
                    let mut functions = Vec::new();
                    while let TokenKind::Identifier(name) = self.kind() {
                        functions.push(name);
                        self.advance();
                    }
                    return Ok(self
                        .context()
                        .expr(ExprKind::Flow { target, functions }, pos));
                }
            }
        }
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_or()?;
        while self.eat(TokenKind::PipeArrow) {
            self.skip_newlines();
            let right = self.parse_or()?;
            left = self
                .context()
                .expr(ExprKind::Pipe { left, right }, left.pos);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = self.context().expr(
                ExprKind::Binary { op: BinaryOp::Or, left, right },
                left.pos,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_bitor()?;
        while self.eat(TokenKind::AndAnd) {
            let right = self.parse_bitor()?;
            left = self.context().expr(
                ExprKind::Binary { op: BinaryOp::And, left, right },
                left.pos,
            );
        }
        Ok(left)
    }

    /// `|` is bitwise-or here unless lookahead says the pair delimits a
    /// pattern guard; guard grammar never descends into this level.
    fn parse_bitor(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_equality()?;
        while self.at(TokenKind::Bar) && !self.in_guard && !self.guard_ahead(self.current) {
            self.advance();
            let right = self.parse_equality()?;
            left = self.context().expr(
                ExprKind::Binary { op: BinaryOp::BitOr, left, right },
                left.pos,
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Is => {
                    self.advance();
                    let op = if self.eat(TokenKind::Not) {
                        BinaryOp::IsNot
                    } else {
                        BinaryOp::Is
                    };
                    let right = self.parse_relational()?;
                    left = self
                        .context()
                        .expr(ExprKind::Binary { op, left, right }, left.pos);
                    continue;
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self
                .context()
                .expr(ExprKind::Binary { op, left, right }, left.pos);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = self
                .context()
                .expr(ExprKind::Binary { op, left, right }, left.pos);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_range()?;
        loop {
            let op = match self.kind() {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_range()?;
            left = self
                .context()
                .expr(ExprKind::Binary { op, left, right }, left.pos);
        }
        Ok(left)
    }

    /// `a..b`, the half-open integer sequence. Non-chaining.
    fn parse_range(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.parse_additive()?;
        if !self.eat(TokenKind::DotDot) {
            return Ok(start);
        }
        let end = self.parse_additive()?;
        Ok(self
            .context()
            .expr(ExprKind::Range { start, end }, start.pos))
    }

    fn parse_additive(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self
                .context()
                .expr(ExprKind::Binary { op, left, right }, left.pos);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = self
                .context()
                .expr(ExprKind::Binary { op, left, right }, left.pos);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> ParseResult<&'a Expr<'a>> {
        let left = self.parse_unary()?;
        if !self.eat(TokenKind::StarStar) {
            return Ok(left);
        }
        // Right-associative.
        let right = self.parse_power()?;
        Ok(self.context().expr(
            ExprKind::Binary { op: BinaryOp::Pow, left, right },
            left.pos,
        ))
    }

    fn parse_unary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let pos = self.pos();
        let kind = match self.kind() {
            TokenKind::Bang | TokenKind::Not => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Unary { op: UnaryOp::Not, operand }
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Unary { op: UnaryOp::Neg, operand }
            }
            TokenKind::Tilde => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Unary { op: UnaryOp::BitNot, operand }
            }
            TokenKind::Await => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Await(operand)
            }
            TokenKind::Ellipsis => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Spread(operand)
            }
            _ => return self.parse_postfix(),
        };
        Ok(self.context().expr(kind, pos))
    }

    fn parse_postfix(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    self.skip_newlines();
                    if !self.eat(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_initializer()?);
                            self.skip_newlines();
                            if self.eat(TokenKind::Comma) {
                                self.skip_newlines();
                                continue;
                            }
                            self.expect(TokenKind::RParen, "')' closing arguments")?;
                            break;
                        }
                    }
                    expr = self
                        .context()
                        .expr(ExprKind::Call { callee: expr, args }, expr.pos);
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_property_name()?;
                    expr = self.context().expr(
                        ExprKind::Member { object: expr, property: MemberProp::Name(name) },
                        expr.pos,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.skip_newlines();
                    let index = self.parse_initializer()?;
                    self.skip_newlines();
                    self.expect(TokenKind::RBracket, "']' closing index")?;
                    expr = self.context().expr(
                        ExprKind::Member { object: expr, property: MemberProp::Computed(index) },
                        expr.pos,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Keywords double as property names (`config.env`, `result.is`).
    fn parse_property_name(&mut self) -> ParseResult<Symbol> {
        let token = *self.peek();
        match token.kind {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(sym)
            }
            kind if kind.is_keyword() => {
                self.advance();
                Ok(token.lexeme)
            }
            _ => Err(self.error_here("expected property name after '.'")),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let token = *self.peek();
        let pos = token.pos;
        match token.kind {
            TokenKind::Number(raw) => {
                self.advance();
                Ok(self.context().expr(ExprKind::Number(raw), pos))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.context().expr(ExprKind::Str(value), pos))
            }
            TokenKind::Backtick(raw) => {
                self.advance();
                Ok(self.context().expr(ExprKind::Backtick(raw), pos))
            }
            TokenKind::TemplateStr(value) => {
                self.advance();
                self.parse_template(value, pos)
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Ok(self.context().expr(ExprKind::Regex { pattern, flags }, pos))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.context().expr(ExprKind::Bool(true), pos))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.context().expr(ExprKind::Bool(false), pos))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self.context().expr(ExprKind::Null, pos))
            }
            TokenKind::Identifier(name) => {
                if self.peek_ahead(1).kind == TokenKind::FatArrow {
                    return self.parse_arrow(vec![name], pos, 2);
                }
                self.advance();
                Ok(self.context().expr(ExprKind::Identifier(name), pos))
            }
            TokenKind::LParen => {
                if self.arrow_params_ahead() {
                    return self.parse_paren_arrow(pos);
                }
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(pos),
            TokenKind::LBrace => self.parse_object_literal(pos),
            TokenKind::Js => self.parse_js_block(),
            TokenKind::Shell => self.parse_shell_block(),
            _ => Err(self.error_here(format!(
                "unexpected token {} in expression",
                self.describe_token(&token)
            ))),
        }
    }

    fn describe_token(&self, token: &crate::token::Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            _ => format!("'{}'", self.interner.resolve(token.lexeme)),
        }
    }

    /// Lookahead over a balanced paren group: arrow iff `=>` follows the
    /// matching `)`.
    fn arrow_params_ahead(&self) -> bool {
        let mut offset = 1;
        let mut depth = 1usize;
        loop {
            match self.peek_ahead(offset).kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
        self.peek_ahead(offset + 1).kind == TokenKind::FatArrow
    }

    fn parse_paren_arrow(&mut self, pos: Pos) -> ParseResult<&'a Expr<'a>> {
        self.advance();
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RParen) {
                break;
            }
            match self.kind() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    params.push(name);
                }
                _ => return Err(self.error_here("expected parameter name")),
            }
            self.skip_newlines();
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "')' closing parameters")?;
                break;
            }
        }
        self.parse_arrow(params, pos, 1)
    }

    /// `skip` positions the cursor past the params (+`=>`): 2 for a bare
    /// identifier, 1 when the paren group was already consumed.
    fn parse_arrow(&mut self, params: Vec<Symbol>, pos: Pos, skip: usize) -> ParseResult<&'a Expr<'a>> {
        for _ in 0..skip {
            self.advance();
        }
        self.skip_newlines();
        let body = if self.at(TokenKind::LBrace) {
            ArrowBody::Block(self.parse_function_body()?)
        } else {
            ArrowBody::Expr(self.parse_initializer()?)
        };
        Ok(self.context().expr(ExprKind::Arrow { params, body }, pos))
    }

    fn parse_array_literal(&mut self, pos: Pos) -> ParseResult<&'a Expr<'a>> {
        self.advance();
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_initializer()?);
            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.skip_newlines();
            self.expect(TokenKind::RBracket, "']' closing array literal")?;
            break;
        }
        Ok(self.context().expr(ExprKind::Array(elements), pos))
    }

    fn parse_object_literal(&mut self, pos: Pos) -> ParseResult<&'a Expr<'a>> {
        self.advance();
        let mut properties = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.eat(TokenKind::Ellipsis) {
                let argument = self.parse_initializer()?;
                properties.push(ObjectProp::Spread { argument });
            } else {
                let token = *self.peek();
                let key = match token.kind {
                    TokenKind::Identifier(sym) => {
                        self.advance();
                        PropKey::Ident(sym)
                    }
                    TokenKind::Str(sym) => {
                        self.advance();
                        PropKey::Str(sym)
                    }
                    kind if kind.is_keyword() => {
                        self.advance();
                        PropKey::Ident(token.lexeme)
                    }
                    _ => return Err(self.error_here("expected property key in object literal")),
                };
                if self.eat(TokenKind::Colon) {
                    self.skip_newlines();
                    let value = self.parse_initializer()?;
                    properties.push(ObjectProp::Property { key, value, shorthand: false });
                } else {
                    let name = match key {
                        PropKey::Ident(sym) | PropKey::Str(sym) => sym,
                    };
                    let value = self.context().expr(ExprKind::Identifier(name), token.pos);
                    properties.push(ObjectProp::Property { key, value, shorthand: true });
                }
            }
            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.skip_newlines();
            self.expect(TokenKind::RBrace, "'}' closing object literal")?;
            break;
        }
        Ok(self.context().expr(ExprKind::Object(properties), pos))
    }

    fn parse_shell_block(&mut self) -> ParseResult<&'a Expr<'a>> {
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
                    _ => return Err(self.error_here("expected shell input name")),
                }
            }
        }
        self.expect(TokenKind::LBrace, "'{' opening shell block")?;
        let body = match self.kind() {
            TokenKind::ShellContent(sym) => {
                self.advance();
                sym
            }
            _ => return Err(self.error_here("expected shell block body")),
        };
        self.expect(TokenKind::RBrace, "'}' closing shell block")?;
        Ok(self
            .context()
            .expr(ExprKind::ShellBlock { inputs, body }, pos))
    }

    // ------------------------------------------------------------------
    // Template strings
    // ------------------------------------------------------------------

    /// Each captured expression span re-scans through a nested lexer and
    /// parser over the same interner and arena.
    fn parse_template(&mut self, value: Symbol, pos: Pos) -> ParseResult<&'a Expr<'a>> {
        let raw = self.interner.resolve(value).to_string();
        let mut parts = Vec::new();
        let mut exprs = Vec::new();
        let mut text = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c == MARK_OPEN {
                parts.push(self.interner.intern(&text));
                text.clear();
                let mut expr_text = String::new();
                for inner in chars.by_ref() {
                    if inner == MARK_CLOSE {
                        break;
                    }
                    expr_text.push(inner);
                }
                exprs.push(self.parse_embedded(&expr_text, pos)?);
            } else {
                text.push(c);
            }
        }
        parts.push(self.interner.intern(&text));
        debug_assert_eq!(parts.len(), exprs.len() + 1);
        Ok(self.context().expr(ExprKind::Template { parts, exprs }, pos))
    }

    fn parse_embedded(&mut self, text: &str, pos: Pos) -> ParseResult<&'a Expr<'a>> {
        let ctx = self.context();
        let tokens = match Lexer::new(text, &mut *self.interner).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                return Err(Diagnostic::new(
                    DiagnosticKind::Parse,
                    pos,
                    format!("in template expression: {}", err.message),
                ))
            }
        };
        let mut inner = Parser::new(tokens, &mut *self.interner, ctx);
        let result = inner.parse_embedded_entry();
        match result {
            Ok(expr) => Ok(expr),
            Err(err) => Err(Diagnostic::new(
                DiagnosticKind::Parse,
                pos,
                format!("in template expression: {}", err.message),
            )),
        }
    }

    fn parse_embedded_entry(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.skip_newlines();
        let expr = self.parse_expression()?;
        self.skip_newlines();
        if !self.at(TokenKind::Eof) {
            return Err(self.error_here("unexpected trailing tokens"));
        }
        Ok(expr)
    }
}
