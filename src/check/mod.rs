mod builtins;
mod shape;

pub use builtins::{is_builtin, member_shape, BUILTIN_IDENTIFIERS};
pub use shape::Shape;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{
    ArrowBody, BinaryOp, DecTarget, Expr, ExprKind, MemberProp, ObjectProp, Program, Stmt,
    StmtKind, UnaryOp,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::intern::{Interner, Symbol};
use crate::registry::{ExportRegistry, ModuleExports};
use crate::suggest::find_similar;
use crate::token::Pos;

/// Shape-based checker with a lexical scope stack. Two passes per block:
/// function and enum declarations hoist, then statements run in order.
/// Accumulates every finding instead of failing fast.
pub struct TypeChecker<'r, 'i> {
    interner: &'i Interner,
    registry: &'r ExportRegistry,
    scopes: Vec<HashMap<String, Shape>>,
    diagnostics: Vec<Diagnostic>,
    exports: IndexMap<String, Shape>,
    required_args: Vec<String>,
}

impl<'r, 'i> TypeChecker<'r, 'i> {
    pub fn new(interner: &'i Interner, registry: &'r ExportRegistry) -> Self {
        TypeChecker {
            interner,
            registry,
            scopes: vec![HashMap::new()],
            diagnostics: Vec::new(),
            exports: IndexMap::new(),
            required_args: Vec::new(),
        }
    }

    /// Check the program. With a `module_path` and a clean result, the
    /// collected export shape is published to the registry.
    pub fn check(mut self, program: &Program<'_>, module_path: Option<&str>) -> Vec<Diagnostic> {
        self.hoist(&program.body);
        for stmt in &program.body {
            self.check_stmt(stmt);
        }
        if self.diagnostics.is_empty() {
            if let Some(path) = module_path {
                self.registry.register(
                    path,
                    ModuleExports {
                        shape: Shape::Object(std::mem::take(&mut self.exports)),
                        required_args: std::mem::take(&mut self.required_args),
                    },
                );
            }
        }
        self.diagnostics
    }

    fn name(&self, sym: Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    fn error(&mut self, pos: Pos, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(DiagnosticKind::Type, pos, message));
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn bind(&mut self, name: String, shape: Shape) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, shape);
        }
    }

    fn resolve(&self, name: &str) -> Option<&Shape> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn suggestion_for<'a>(&'a self, name: &str) -> Option<String> {
        let mut candidates: Vec<&'a str> = Vec::new();
        for scope in &self.scopes {
            for key in scope.keys() {
                candidates.push(key.as_str());
            }
        }
        candidates.extend(BUILTIN_IDENTIFIERS.iter().map(|s| -> &'a str { s }));
        find_similar(name, candidates, 2).map(str::to_string)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Hoisting pass: functions and enums become visible to the whole
    /// block before any statement runs.
    fn hoist(&mut self, stmts: &[Stmt<'_>]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Function { name, params, .. } => {
                    let shape = Shape::function(vec![Shape::Any; params.len()], Shape::Unknown);
                    self.bind(self.name(*name), shape);
                }
                StmtKind::EnumDecl { name, members, .. } => {
                    let shape = Shape::Enum {
                        name: self.name(*name),
                        members: members.iter().map(|m| self.name(m.name)).collect(),
                    };
                    self.bind(self.name(*name), shape);
                }
                _ => {}
            }
        }
    }

    fn check_block(&mut self, stmts: &[Stmt<'_>]) {
        self.scopes.push(HashMap::new());
        self.hoist(stmts);
        for stmt in stmts {
            self.check_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &Stmt<'_>) {
        match &stmt.kind {
            StmtKind::Dec { target, init, exposed, .. } => {
                let shape = self.infer(init);
                self.bind_dec_target(target, &shape, stmt.pos);
                if *exposed {
                    for name in target.bound_names() {
                        let bound = self
                            .resolve(self.interner.resolve(name))
                            .cloned()
                            .unwrap_or(Shape::Unknown);
                        self.exports.insert(self.name(name), bound);
                    }
                }
            }
            StmtKind::Function { name, params, body, exposed, .. } => {
                self.scopes.push(HashMap::new());
                for param in params {
                    self.bind(self.name(*param), Shape::Any);
                }
                self.hoist(body);
                for inner in *body {
                    self.check_stmt(inner);
                }
                self.scopes.pop();
                if *exposed {
                    let shape = self
                        .resolve(self.interner.resolve(*name))
                        .cloned()
                        .unwrap_or(Shape::Unknown);
                    self.exports.insert(self.name(*name), shape);
                }
            }
            StmtKind::EnumDecl { name, exposed, .. } => {
                if *exposed {
                    let shape = self
                        .resolve(self.interner.resolve(*name))
                        .cloned()
                        .unwrap_or(Shape::Unknown);
                    self.exports.insert(self.name(*name), shape);
                }
            }
            StmtKind::Arg { name, required, default, .. } => {
                if let Some(default) = default {
                    self.infer(default);
                }
                self.bind(self.name(*name), Shape::Any);
                self.exports.insert(self.name(*name), Shape::Any);
                if *required {
                    self.required_args.push(self.name(*name));
                }
            }
            StmtKind::Env { name, default, .. } => {
                if let Some(default) = default {
                    self.infer(default);
                }
                self.bind(self.name(*name), Shape::Any);
                self.exports.insert(self.name(*name), Shape::Any);
            }
            StmtKind::Dep { alias, path, overrides } => {
                let dotted = path
                    .iter()
                    .map(|s| self.interner.resolve(*s))
                    .collect::<Vec<_>>()
                    .join(".");
                match self.registry.exports_of(&dotted) {
                    Some(exports) => {
                        if let Some(overrides) = overrides {
                            self.check_dep_overrides(&dotted, &exports.shape, overrides);
                        }
                        self.bind(self.name(*alias), exports.shape);
                    }
                    None => self.bind(self.name(*alias), Shape::Any),
                }
            }
            StmtKind::Block(body) => self.check_block(body),
            StmtKind::If { test, consequent, alternate } => {
                self.infer(test);
                self.check_block(consequent);
                if let Some(alternate) = alternate {
                    self.check_stmt(alternate);
                }
            }
            StmtKind::While { test, body } => {
                self.infer(test);
                self.check_block(body);
            }
            StmtKind::ForIn { binding, iterable, body } => {
                let iterable_shape = self.infer(iterable);
                let element = match iterable_shape {
                    Shape::Array(element) => *element,
                    _ => Shape::Unknown,
                };
                self.scopes.push(HashMap::new());
                self.bind(self.name(*binding), element);
                self.hoist(body);
                for inner in *body {
                    self.check_stmt(inner);
                }
                self.scopes.pop();
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.infer(value);
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Try { block, handler, finalizer } => {
                self.check_block(block);
                if let Some(handler) = handler {
                    self.scopes.push(HashMap::new());
                    if let Some(param) = handler.param {
                        self.bind(self.name(param), Shape::Any);
                    }
                    self.hoist(handler.body);
                    for inner in handler.body {
                        self.check_stmt(inner);
                    }
                    self.scopes.pop();
                }
                if let Some(finalizer) = finalizer {
                    self.check_block(finalizer);
                }
            }
            StmtKind::Throw(value) => {
                self.infer(value);
            }
            StmtKind::PatternMatch { arms, .. } => {
                for arm in arms {
                    self.infer(arm.guard);
                    self.check_block(arm.body);
                }
            }
            StmtKind::Print(args) => {
                for arg in args {
                    self.infer(arg);
                }
            }
            StmtKind::Expression(expr) => {
                self.infer(expr);
            }
            StmtKind::TestBlock { body, .. } | StmtKind::DescribeBlock { body, .. } => {
                self.check_block(body);
            }
            StmtKind::ExpectStmt { actual, expected, .. } => {
                self.infer(actual);
                if let Some(expected) = expected {
                    self.infer(expected);
                }
            }
            StmtKind::AssertStmt { test, message } => {
                self.infer(test);
                if let Some(message) = message {
                    self.infer(message);
                }
            }
        }
    }

    fn bind_dec_target(&mut self, target: &DecTarget, shape: &Shape, pos: Pos) {
        match target {
            DecTarget::Name(name) => {
                self.bind(self.name(*name), shape.clone());
            }
            DecTarget::Object(props) => {
                for prop in props {
                    let key = self.name(prop.key);
                    let bound = match shape {
                        Shape::Object(object_props) if !object_props.is_empty() => {
                            match object_props.get(&key) {
                                Some(inner) => inner.clone(),
                                None => {
                                    self.error(
                                        pos,
                                        format!(
                                            "cannot destructure property '{}': it does not exist on {}",
                                            key, shape
                                        ),
                                    );
                                    Shape::Unknown
                                }
                            }
                        }
                        _ => Shape::Unknown,
                    };
                    self.bind(self.name(prop.binding), bound);
                }
            }
            DecTarget::Array(elements) => {
                let element = match shape {
                    Shape::Array(element) => (**element).clone(),
                    _ => Shape::Unknown,
                };
                for name in elements.iter().flatten() {
                    self.bind(self.name(*name), element.clone());
                }
            }
        }
    }

    /// Plain keys must match the target module's exported member shapes;
    /// dotted-path keys are inner-dep overrides and are skipped.
    fn check_dep_overrides(&mut self, dotted: &str, target: &Shape, overrides: &Expr<'_>) {
        let ExprKind::Object(props) = &overrides.kind else {
            return;
        };
        let Shape::Object(exported) = target else {
            return;
        };
        for prop in props {
            let ObjectProp::Property { key, value, .. } = prop else {
                continue;
            };
            let key_text = key.text(self.interner).to_string();
            if key_text.contains('.') {
                continue;
            }
            let actual = self.infer(value);
            match exported.get(&key_text) {
                Some(expected) => {
                    if !Shape::compatible(expected, &actual) {
                        self.error(
                            value.pos,
                            format!(
                                "override '{}' for module '{}' expects {}, found {}",
                                key_text, dotted, expected, actual
                            ),
                        );
                    }
                }
                None => {
                    self.error(
                        value.pos,
                        format!("module '{}' has no exported member '{}'", dotted, key_text),
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn infer(&mut self, expr: &Expr<'_>) -> Shape {
        match &expr.kind {
            ExprKind::Number(_) => Shape::Number,
            ExprKind::Str(_) | ExprKind::Backtick(_) => Shape::String,
            ExprKind::Bool(_) => Shape::Boolean,
            ExprKind::Null => Shape::Null,
            ExprKind::Regex { .. } => Shape::Unknown,
            ExprKind::Template { exprs, .. } => {
                for inner in exprs {
                    self.infer(inner);
                }
                Shape::String
            }
            ExprKind::Identifier(sym) => self.infer_identifier(*sym, expr.pos),
            ExprKind::Member { object, property } => self.infer_member(object, property),
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.infer(arg);
                }
                // Method calls: built-in array/string members carry their
                // specified return shapes; object members must hold
                // functions.
                if let ExprKind::Member { object, property } = &callee.kind {
                    let receiver = self.infer(object);
                    return match property {
                        MemberProp::Name(sym) => {
                            let name = self.interner.resolve(*sym).to_string();
                            self.infer_method_call(object.pos, &receiver, &name)
                        }
                        MemberProp::Computed(index) => {
                            self.infer(index);
                            Shape::Any
                        }
                    };
                }
                let callee_shape = self.infer(callee);
                if !callee_shape.is_callable() {
                    let message = match callee.identifier() {
                        Some(sym) => format!(
                            "'{}' is not a function (it is {})",
                            self.interner.resolve(sym),
                            callee_shape
                        ),
                        None => format!("cannot call a value of type {}", callee_shape),
                    };
                    self.error(callee.pos, message);
                    return Shape::Unknown;
                }
                match callee_shape {
                    Shape::Function { ret, .. } => *ret,
                    _ => Shape::Any,
                }
            }
            ExprKind::Unary { op, operand } => {
                self.infer(operand);
                match op {
                    UnaryOp::Not => Shape::Boolean,
                    UnaryOp::Neg | UnaryOp::BitNot => Shape::Number,
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left_shape = self.infer(left);
                let right_shape = self.infer(right);
                match op {
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Is
                    | BinaryOp::IsNot
                    | BinaryOp::Lt
                    | BinaryOp::Gt
                    | BinaryOp::LtEq
                    | BinaryOp::GtEq => Shape::Boolean,
                    BinaryOp::And | BinaryOp::Or => Shape::Unknown,
                    BinaryOp::Add => {
                        if left_shape == Shape::String || right_shape == Shape::String {
                            Shape::String
                        } else {
                            Shape::Number
                        }
                    }
                    _ => Shape::Number,
                }
            }
            ExprKind::Assign { target, value, .. } => {
                let shape = self.infer(value);
                if let Some(sym) = target.identifier() {
                    // Assignment introduces or retypes a mutable binding.
                    self.bind(self.name(sym), shape.clone());
                } else {
                    self.infer(target);
                }
                shape
            }
            ExprKind::Conditional { test, consequent, alternate } => {
                self.infer(test);
                let a = self.infer(consequent);
                let b = self.infer(alternate);
                if a == b {
                    a
                } else {
                    Shape::Unknown
                }
            }
            ExprKind::Arrow { params, body } => {
                self.scopes.push(HashMap::new());
                for param in params {
                    self.bind(self.name(*param), Shape::Any);
                }
                let ret = match body {
                    ArrowBody::Expr(expr) => self.infer(expr),
                    ArrowBody::Block(stmts) => {
                        self.hoist(stmts);
                        for inner in *stmts {
                            self.check_stmt(inner);
                        }
                        Shape::Unknown
                    }
                };
                self.scopes.pop();
                Shape::function(vec![Shape::Any; params.len()], ret)
            }
            ExprKind::Array(elements) => {
                let mut element = None;
                for inner in elements {
                    let shape = self.infer(inner);
                    element = match element {
                        None => Some(shape),
                        Some(prev) if prev == shape => Some(prev),
                        Some(_) => Some(Shape::Unknown),
                    };
                }
                Shape::array_of(element.unwrap_or(Shape::Unknown))
            }
            ExprKind::Object(props) => {
                let mut shape_props = IndexMap::new();
                let mut spread = false;
                for prop in props {
                    match prop {
                        ObjectProp::Property { key, value, .. } => {
                            let shape = self.infer(value);
                            shape_props.insert(key.text(self.interner).to_string(), shape);
                        }
                        ObjectProp::Spread { argument } => {
                            self.infer(argument);
                            spread = true;
                        }
                    }
                }
                if spread {
                    // Spread merges keys this checker cannot see.
                    Shape::Any
                } else {
                    Shape::Object(shape_props)
                }
            }
            ExprKind::Spread(argument) => {
                self.infer(argument);
                Shape::Unknown
            }
            ExprKind::Await(operand) => {
                self.infer(operand);
                Shape::Any
            }
            ExprKind::Range { start, end } => {
                self.infer(start);
                self.infer(end);
                Shape::array_of(Shape::Number)
            }
            ExprKind::Flow { target, functions } => {
                for function in functions {
                    self.infer_identifier(*function, expr.pos);
                }
                let shape = Shape::function(vec![Shape::Any], Shape::Unknown);
                self.bind(self.name(*target), shape.clone());
                shape
            }
            ExprKind::Pipe { left, right } => {
                self.infer(left);
                match self.infer(right) {
                    Shape::Function { ret, .. } => *ret,
                    _ => Shape::Any,
                }
            }
            ExprKind::JsBlock { inputs, .. } => {
                for input in inputs {
                    self.infer_identifier(*input, expr.pos);
                }
                Shape::Any
            }
            ExprKind::ShellBlock { inputs, .. } => {
                for input in inputs {
                    self.infer_identifier(*input, expr.pos);
                }
                let mut props = IndexMap::new();
                props.insert("stdout".to_string(), Shape::String);
                props.insert("stderr".to_string(), Shape::String);
                props.insert("exitCode".to_string(), Shape::Number);
                Shape::Object(props)
            }
        }
    }

    fn infer_method_call(&mut self, pos: Pos, receiver: &Shape, name: &str) -> Shape {
        match receiver {
            Shape::Array(_) | Shape::String => member_shape(receiver, name).unwrap_or(Shape::Any),
            Shape::Object(props) if !props.is_empty() => match props.get(name) {
                Some(Shape::Function { ret, .. }) => (**ret).clone(),
                Some(shape) if shape.is_wildcard() => Shape::Any,
                Some(shape) => {
                    self.error(pos, format!("property '{}' is not a function (it is {})", name, shape));
                    Shape::Unknown
                }
                None => {
                    self.error(
                        pos,
                        format!("property '{}' does not exist on {}", name, receiver),
                    );
                    Shape::Unknown
                }
            },
            Shape::Enum { name: enum_name, .. } => {
                self.error(
                    pos,
                    format!("enum '{}' members are not callable", enum_name),
                );
                Shape::Unknown
            }
            _ => Shape::Any,
        }
    }

    fn infer_identifier(&mut self, sym: Symbol, pos: Pos) -> Shape {
        let name = self.interner.resolve(sym);
        if let Some(shape) = self.resolve(name) {
            return shape.clone();
        }
        if is_builtin(name) {
            return Shape::Any;
        }
        let mut message = format!("undefined identifier '{}'", name);
        if let Some(suggestion) = self.suggestion_for(name) {
            message.push_str(&format!("; did you mean '{}'?", suggestion));
        }
        self.error(pos, message);
        Shape::Unknown
    }

    fn infer_member(&mut self, object: &Expr<'_>, property: &MemberProp<'_>) -> Shape {
        let receiver = self.infer(object);
        match property {
            MemberProp::Name(sym) => {
                let name = self.interner.resolve(*sym).to_string();
                match &receiver {
                    Shape::Object(props) if !props.is_empty() => match props.get(&name) {
                        Some(shape) => shape.clone(),
                        None => {
                            self.error(
                                object.pos,
                                format!("property '{}' does not exist on {}", name, receiver),
                            );
                            Shape::Unknown
                        }
                    },
                    Shape::Enum { name: enum_name, members } => {
                        if members.iter().any(|member| member == &name) {
                            Shape::Number
                        } else {
                            self.error(
                                object.pos,
                                format!("enum '{}' has no member '{}'", enum_name, name),
                            );
                            Shape::Unknown
                        }
                    }
                    Shape::Array(_) | Shape::String => {
                        member_shape(&receiver, &name).unwrap_or(Shape::Any)
                    }
                    _ => Shape::Any,
                }
            }
            MemberProp::Computed(index) => {
                self.infer(index);
                match receiver {
                    Shape::Array(element) => *element,
                    _ => Shape::Any,
                }
            }
        }
    }
}
