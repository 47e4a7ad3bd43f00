use serde::Serialize;

use crate::ast::{
    ArrowBody, DecTarget, Expr, ExprKind, ObjectProp, Program, Stmt, StmtKind,
};
use crate::intern::Interner;
use crate::token::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct LintMessage {
    pub rule: &'static str,
    pub severity: Severity,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Per-rule switches. Everything defaults on.
#[derive(Debug, Clone)]
pub struct LintOptions {
    pub unused: bool,
    pub shadow: bool,
    pub unreachable: bool,
    pub empty_block: bool,
    pub constant_condition: bool,
    pub duplicate_key: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        LintOptions {
            unused: true,
            shadow: true,
            unreachable: true,
            empty_block: true,
            constant_condition: true,
            duplicate_key: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Variable,
    Function,
}

struct Binding {
    name: String,
    pos: Pos,
    kind: BindingKind,
    exposed: bool,
    used: bool,
}

/// AST-driven linter. Three passes: collect top-level declarations, walk
/// the program tracking uses and nested scopes, report on scope exit.
pub fn lint(program: &Program<'_>, interner: &Interner, options: &LintOptions) -> Vec<LintMessage> {
    let mut linter = Linter {
        interner,
        options,
        scopes: vec![Vec::new()],
        messages: Vec::new(),
    };
    linter.collect_top_level(&program.body);
    for stmt in &program.body {
        linter.walk_stmt(stmt, true);
    }
    linter.finish()
}

struct Linter<'i, 'o> {
    interner: &'i Interner,
    options: &'o LintOptions,
    scopes: Vec<Vec<Binding>>,
    messages: Vec<LintMessage>,
}

impl<'i, 'o> Linter<'i, 'o> {
    fn finish(mut self) -> Vec<LintMessage> {
        let root = self.scopes.pop().unwrap_or_default();
        self.report_unused(&root);
        self.messages
    }

    fn push(&mut self, rule: &'static str, severity: Severity, pos: Pos, message: String) {
        self.messages.push(LintMessage {
            rule,
            severity,
            line: pos.line,
            column: pos.column,
            message,
        });
    }

    // ------------------------------------------------------------------
    // Declarations and uses
    // ------------------------------------------------------------------

    fn collect_top_level(&mut self, stmts: &[Stmt<'_>]) {
        for stmt in stmts {
            self.declare_from(stmt);
        }
    }

    fn declare_from(&mut self, stmt: &Stmt<'_>) {
        match &stmt.kind {
            StmtKind::Dec { target, exposed, .. } => {
                for name in target.bound_names() {
                    self.declare(
                        self.interner.resolve(name).to_string(),
                        stmt.pos,
                        BindingKind::Variable,
                        *exposed,
                    );
                }
            }
            StmtKind::Function { name, exposed, .. } => {
                self.declare(
                    self.interner.resolve(*name).to_string(),
                    stmt.pos,
                    BindingKind::Function,
                    *exposed,
                );
            }
            StmtKind::EnumDecl { name, exposed, .. } => {
                self.declare(
                    self.interner.resolve(*name).to_string(),
                    stmt.pos,
                    BindingKind::Variable,
                    *exposed,
                );
            }
            StmtKind::Arg { name, .. } | StmtKind::Env { name, .. } => {
                // Args and envs are part of the module surface; treat as
                // exposed so they never report unused.
                self.declare(
                    self.interner.resolve(*name).to_string(),
                    stmt.pos,
                    BindingKind::Variable,
                    true,
                );
            }
            StmtKind::Dep { alias, .. } => {
                self.declare(
                    self.interner.resolve(*alias).to_string(),
                    stmt.pos,
                    BindingKind::Variable,
                    false,
                );
            }
            _ => {}
        }
    }

    fn declare(&mut self, name: String, pos: Pos, kind: BindingKind, exposed: bool) {
        if self.options.shadow {
            let shadows = self.scopes[..self.scopes.len().saturating_sub(1)]
                .iter()
                .any(|scope| scope.iter().any(|b| b.name == name));
            if shadows {
                self.push(
                    "shadow-variable",
                    Severity::Warning,
                    pos,
                    format!("'{}' shadows an outer binding", name),
                );
            }
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Binding { name, pos, kind, exposed, used: false });
        }
    }

    fn mark_used(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.iter_mut().rev().find(|b| b.name == name) {
                binding.used = true;
                return;
            }
        }
    }

    fn report_unused(&mut self, scope: &[Binding]) {
        if !self.options.unused {
            return;
        }
        let mut found = Vec::new();
        for binding in scope {
            if binding.used || binding.exposed || binding.name.starts_with('_') {
                continue;
            }
            found.push(match binding.kind {
                BindingKind::Variable => (
                    "unused-variable",
                    binding.pos,
                    format!("'{}' is declared but never used", binding.name),
                ),
                BindingKind::Function => (
                    "unused-function",
                    binding.pos,
                    format!("function '{}' is declared but never called", binding.name),
                ),
            });
        }
        for (rule, pos, message) in found {
            self.push(rule, Severity::Warning, pos, message);
        }
    }

    // ------------------------------------------------------------------
    // Walk
    // ------------------------------------------------------------------

    fn walk_block(&mut self, stmts: &[Stmt<'_>], context: &str, pos: Pos) {
        if self.options.empty_block && stmts.is_empty() {
            self.push(
                "empty-block",
                Severity::Info,
                pos,
                format!("empty {} block", context),
            );
        }
        self.scopes.push(Vec::new());
        let mut terminated = false;
        for stmt in stmts {
            if terminated {
                if self.options.unreachable {
                    self.push(
                        "unreachable-code",
                        Severity::Warning,
                        stmt.pos,
                        "unreachable code".to_string(),
                    );
                }
                terminated = false;
            }
            self.walk_stmt(stmt, false);
            terminated = matches!(
                stmt.kind,
                StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Break | StmtKind::Continue
            );
        }
        let scope = self.scopes.pop().unwrap_or_default();
        self.report_unused(&scope);
    }

    fn check_condition(&mut self, test: &Expr<'_>, what: &str) {
        if !self.options.constant_condition {
            return;
        }
        if let ExprKind::Bool(value) = test.kind {
            self.push(
                "constant-condition",
                Severity::Warning,
                test.pos,
                format!("{} condition is always {}", what, value),
            );
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt<'_>, top_level: bool) {
        if !top_level {
            self.declare_from(stmt);
        }
        match &stmt.kind {
            StmtKind::Dec { init, .. } => self.walk_expr(init),
            StmtKind::Function { params, body, .. } => {
                self.scopes.push(Vec::new());
                for param in params {
                    let name = self.interner.resolve(*param).to_string();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.push(Binding {
                            name,
                            pos: stmt.pos,
                            kind: BindingKind::Variable,
                            // Parameters are part of the signature; an
                            // unused one is not worth a warning.
                            exposed: true,
                            used: false,
                        });
                    }
                }
                self.walk_block(body, "function", stmt.pos);
                let scope = self.scopes.pop().unwrap_or_default();
                self.report_unused(&scope);
            }
            StmtKind::EnumDecl { .. } => {}
            StmtKind::Arg { default, .. } | StmtKind::Env { default, .. } => {
                if let Some(default) = default {
                    self.walk_expr(default);
                }
            }
            StmtKind::Dep { overrides, .. } => {
                if let Some(overrides) = overrides {
                    self.walk_expr(overrides);
                }
            }
            StmtKind::Block(body) => self.walk_block(body, "bare", stmt.pos),
            StmtKind::If { test, consequent, alternate } => {
                self.check_condition(test, "if");
                self.walk_expr(test);
                self.walk_block(consequent, "if", stmt.pos);
                if let Some(alternate) = alternate {
                    self.walk_stmt(alternate, false);
                }
            }
            StmtKind::While { test, body } => {
                self.check_condition(test, "while");
                self.walk_expr(test);
                self.walk_block(body, "while", stmt.pos);
            }
            StmtKind::ForIn { binding, iterable, body } => {
                self.walk_expr(iterable);
                self.scopes.push(Vec::new());
                let name = self.interner.resolve(*binding).to_string();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.push(Binding {
                        name,
                        pos: stmt.pos,
                        kind: BindingKind::Variable,
                        exposed: false,
                        used: false,
                    });
                }
                self.walk_block(body, "for", stmt.pos);
                let scope = self.scopes.pop().unwrap_or_default();
                self.report_unused(&scope);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.walk_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Try { block, handler, finalizer } => {
                self.walk_block(block, "try", stmt.pos);
                if let Some(handler) = handler {
                    self.scopes.push(Vec::new());
                    if let Some(param) = handler.param {
                        let name = self.interner.resolve(param).to_string();
                        if let Some(scope) = self.scopes.last_mut() {
                            scope.push(Binding {
                                name,
                                pos: stmt.pos,
                                kind: BindingKind::Variable,
                                exposed: true,
                                used: false,
                            });
                        }
                    }
                    self.walk_block(handler.body, "catch", stmt.pos);
                    self.scopes.pop();
                }
                if let Some(finalizer) = finalizer {
                    self.walk_block(finalizer, "finally", stmt.pos);
                }
            }
            StmtKind::Throw(value) => self.walk_expr(value),
            StmtKind::PatternMatch { arms, .. } => {
                for arm in arms {
                    self.check_condition(arm.guard, "pattern-guard");
                    self.walk_expr(arm.guard);
                    self.walk_block(arm.body, "pattern arm", stmt.pos);
                }
            }
            StmtKind::Print(args) => {
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            StmtKind::Expression(expr) => self.walk_expr(expr),
            StmtKind::TestBlock { body, .. } | StmtKind::DescribeBlock { body, .. } => {
                self.walk_block(body, "test", stmt.pos);
            }
            StmtKind::ExpectStmt { actual, expected, .. } => {
                self.walk_expr(actual);
                if let Some(expected) = expected {
                    self.walk_expr(expected);
                }
            }
            StmtKind::AssertStmt { test, message } => {
                self.walk_expr(test);
                if let Some(message) = message {
                    self.walk_expr(message);
                }
            }
        }
    }

    fn walk_expr(&mut self, expr: &Expr<'_>) {
        match &expr.kind {
            ExprKind::Number(_)
            | ExprKind::Str(_)
            | ExprKind::Backtick(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Regex { .. } => {}
            ExprKind::Template { exprs, .. } => {
                for inner in exprs {
                    self.walk_expr(inner);
                }
            }
            ExprKind::Identifier(sym) => {
                let name = self.interner.resolve(*sym).to_string();
                self.mark_used(&name);
            }
            ExprKind::Member { object, property } => {
                self.walk_expr(object);
                if let crate::ast::MemberProp::Computed(index) = property {
                    self.walk_expr(index);
                }
            }
            ExprKind::Call { callee, args } => {
                self.walk_expr(callee);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.walk_expr(target);
                self.walk_expr(value);
            }
            ExprKind::Conditional { test, consequent, alternate } => {
                self.walk_expr(test);
                self.walk_expr(consequent);
                self.walk_expr(alternate);
            }
            ExprKind::Arrow { params, body } => {
                self.scopes.push(Vec::new());
                for param in params {
                    let name = self.interner.resolve(*param).to_string();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.push(Binding {
                            name,
                            pos: expr.pos,
                            kind: BindingKind::Variable,
                            exposed: true,
                            used: false,
                        });
                    }
                }
                match body {
                    ArrowBody::Expr(inner) => self.walk_expr(inner),
                    ArrowBody::Block(stmts) => self.walk_block(stmts, "arrow", expr.pos),
                }
                self.scopes.pop();
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.walk_expr(element);
                }
            }
            ExprKind::Object(props) => {
                if self.options.duplicate_key {
                    let mut seen: Vec<String> = Vec::new();
                    for prop in props {
                        if let ObjectProp::Property { key, .. } = prop {
                            let text = key.text(self.interner).to_string();
                            if seen.contains(&text) {
                                self.push(
                                    "duplicate-key",
                                    Severity::Error,
                                    expr.pos,
                                    format!("duplicate object key '{}'", text),
                                );
                            } else {
                                seen.push(text);
                            }
                        }
                    }
                }
                for prop in props {
                    match prop {
                        ObjectProp::Property { value, .. } => self.walk_expr(value),
                        ObjectProp::Spread { argument } => self.walk_expr(argument),
                    }
                }
            }
            ExprKind::Spread(argument) => self.walk_expr(argument),
            ExprKind::Await(operand) => self.walk_expr(operand),
            ExprKind::Range { start, end } => {
                self.walk_expr(start);
                self.walk_expr(end);
            }
            ExprKind::Flow { functions, .. } => {
                for function in functions {
                    let name = self.interner.resolve(*function).to_string();
                    self.mark_used(&name);
                }
            }
            ExprKind::Pipe { left, right } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            ExprKind::JsBlock { inputs, .. } | ExprKind::ShellBlock { inputs, .. } => {
                for input in inputs {
                    let name = self.interner.resolve(*input).to_string();
                    self.mark_used(&name);
                }
            }
        }
    }
}
