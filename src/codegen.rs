//! AST → JavaScript text. Prepends the runtime preamble, wraps the
//! program in a module factory, and emits every node in conservatively
//! parenthesized form so JS precedence can never surprise.

use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, Block, DecTarget, Expr, ExprKind, MemberProp, ObjectProp,
    Program, PropKey, Stmt, StmtKind, UnaryOp,
};
use crate::intern::{Interner, Symbol};

const PREAMBLE: &str = include_str!("runtime/preamble.js");
const SHELL_HELPER: &str = include_str!("runtime/shell_helper.js");

pub fn generate(program: &Program<'_>, interner: &Interner) -> String {
    let mut emitter = Emitter {
        interner,
        out: String::new(),
        indent: 0,
        fn_depth: 0,
    };
    emitter.emit_program(program);
    emitter.out
}

/// Quote a string as a JS double-quoted literal.
pub(crate) fn js_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Escape text for the inside of a JS backtick template.
fn template_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}

struct Emitter<'i> {
    interner: &'i Interner,
    out: String,
    indent: usize,
    fn_depth: usize,
}

impl<'i> Emitter<'i> {
    fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn indent_str(&self) -> String {
        "  ".repeat(self.indent)
    }

    fn line(&mut self, text: &str) {
        let indent = self.indent_str();
        self.out.push_str(&indent);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Redirect emission into a fresh buffer; used for blocks that live
    /// inside expression strings (arrow bodies).
    fn capture<F: FnOnce(&mut Self)>(&mut self, f: F) -> String {
        let saved = std::mem::take(&mut self.out);
        f(self);
        std::mem::replace(&mut self.out, saved)
    }

    // ------------------------------------------------------------------
    // Module layout
    // ------------------------------------------------------------------

    fn emit_program(&mut self, program: &Program<'_>) {
        self.out.push_str(PREAMBLE);
        if program.body.iter().any(stmt_has_shell) {
            self.blank();
            self.out.push_str(SHELL_HELPER);
        }
        self.blank();

        for stmt in &program.body {
            if let StmtKind::Dep { alias, path, .. } = &stmt.kind {
                let alias = self.name(*alias).to_string();
                let file = path
                    .iter()
                    .map(|s| self.name(*s))
                    .collect::<Vec<_>>()
                    .join("/");
                self.line(&format!("import _dep_{} from './{}.km';", alias, file));
            }
        }

        self.line("export default function(_opts = {}) {");
        self.indent += 1;

        // Existence checks for required args and envs come first.
        for stmt in &program.body {
            match &stmt.kind {
                StmtKind::Arg { name, required: true, .. } => {
                    let name = self.name(*name).to_string();
                    self.line(&format!(
                        "if (_opts[{}] === undefined) {{ throw new Error({}); }}",
                        js_string_literal(&name),
                        js_string_literal(&format!("Missing required argument: {}", name))
                    ));
                }
                StmtKind::Env { name, required: true, .. } => {
                    let name = self.name(*name).to_string();
                    self.line(&format!(
                        "if (process.env[{}] === undefined) {{ throw new Error({}); }}",
                        js_string_literal(&name),
                        js_string_literal(&format!("Missing required environment variable: {}", name))
                    ));
                }
                _ => {}
            }
        }

        for stmt in &program.body {
            match &stmt.kind {
                StmtKind::Arg { name, default, secret, .. } => {
                    let name = self.name(*name).to_string();
                    let quoted = js_string_literal(&name);
                    let fallback = match default {
                        Some(default) => self.emit_expr(default),
                        None => "undefined".to_string(),
                    };
                    let value = format!(
                        "_opts[{0}] !== undefined ? _opts[{0}] : {1}",
                        quoted, fallback
                    );
                    if *secret {
                        self.line(&format!("const {} = _secret({});", name, value));
                    } else {
                        self.line(&format!("const {} = {};", name, value));
                    }
                }
                StmtKind::Env { name, default, secret, .. } => {
                    let name = self.name(*name).to_string();
                    let quoted = js_string_literal(&name);
                    let fallback = match default {
                        Some(default) => self.emit_expr(default),
                        None => "undefined".to_string(),
                    };
                    let value = format!(
                        "process.env[{0}] !== undefined ? process.env[{0}] : {1}",
                        quoted, fallback
                    );
                    if *secret {
                        self.line(&format!("const {} = _secret({});", name, value));
                    } else {
                        self.line(&format!("const {} = {};", name, value));
                    }
                }
                StmtKind::Dep { alias, path, overrides } => {
                    let alias = self.name(*alias).to_string();
                    let dotted = path
                        .iter()
                        .map(|s| self.name(*s))
                        .collect::<Vec<_>>()
                        .join(".");
                    let call = match overrides {
                        Some(overrides) => {
                            let rendered = self.emit_expr(overrides);
                            format!("_dep_{}({})", alias, rendered)
                        }
                        None => format!("_dep_{}()", alias),
                    };
                    self.line(&format!(
                        "const {} = _opts[{}] || {};",
                        alias,
                        js_string_literal(&dotted),
                        call
                    ));
                }
                _ => {}
            }
        }

        for stmt in &program.body {
            if matches!(
                stmt.kind,
                StmtKind::Arg { .. } | StmtKind::Env { .. } | StmtKind::Dep { .. }
            ) {
                continue;
            }
            self.emit_stmt(stmt);
        }

        let exposed = exposed_names(program, self.interner);
        if exposed.is_empty() {
            self.line("return {};");
        } else {
            self.line(&format!("return {{ {} }};", exposed.join(", ")));
        }

        self.indent -= 1;
        self.line("}");
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt<'_>) {
        match &stmt.kind {
            StmtKind::Dec { target, init, secret, .. } => {
                let rendered = self.emit_expr(init);
                let frozen = if *secret {
                    format!("_deepFreeze(_secret({}))", rendered)
                } else {
                    format!("_deepFreeze({})", rendered)
                };
                match target {
                    DecTarget::Name(name) => {
                        let name = self.name(*name).to_string();
                        self.line(&format!("const {} = {};", name, frozen));
                    }
                    DecTarget::Object(props) => {
                        let parts: Vec<String> = props
                            .iter()
                            .map(|prop| {
                                if prop.key == prop.binding {
                                    self.name(prop.key).to_string()
                                } else {
                                    format!("{}: {}", self.name(prop.key), self.name(prop.binding))
                                }
                            })
                            .collect();
                        self.line(&format!("const {{ {} }} = {};", parts.join(", "), frozen));
                    }
                    DecTarget::Array(elements) => {
                        let parts: Vec<String> = elements
                            .iter()
                            .map(|element| match element {
                                Some(name) => self.name(*name).to_string(),
                                None => String::new(),
                            })
                            .collect();
                        self.line(&format!("const [{}] = {};", parts.join(", "), frozen));
                    }
                }
            }
            StmtKind::Function { name, params, body, is_async, memoized, .. } => {
                if *memoized {
                    self.emit_memo_function(*name, params, body, *is_async);
                } else {
                    let keyword = if *is_async { "async function" } else { "function" };
                    let params = self.param_list(params);
                    let name = self.name(*name).to_string();
                    self.line(&format!("{} {}({}) {{", keyword, name, params));
                    self.emit_function_body(body);
                    self.line("}");
                }
            }
            StmtKind::EnumDecl { name, members, .. } => {
                let mut next = 0i64;
                let rendered: Vec<String> = members
                    .iter()
                    .map(|member| {
                        if let Some(value) = member.value {
                            next = value;
                        }
                        let entry = format!("{}: {}", self.name(member.name), next);
                        next += 1;
                        entry
                    })
                    .collect();
                let name = self.name(*name).to_string();
                self.line(&format!(
                    "const {} = Object.freeze({{ {} }});",
                    name,
                    rendered.join(", ")
                ));
            }
            StmtKind::Arg { .. } | StmtKind::Env { .. } | StmtKind::Dep { .. } => {
                // Handled by the module wrapper.
            }
            StmtKind::Block(body) => {
                self.line("{");
                self.indent += 1;
                for inner in *body {
                    self.emit_stmt(inner);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::If { test, consequent, alternate } => {
                self.emit_if(test, consequent, alternate.as_deref(), "");
            }
            StmtKind::While { test, body } => {
                let test = self.emit_expr(test);
                self.line(&format!("while ({}) {{", test));
                self.indent += 1;
                for inner in *body {
                    self.emit_stmt(inner);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::ForIn { binding, iterable, body } => {
                let iterable = self.emit_expr(iterable);
                let binding = self.name(*binding).to_string();
                self.line(&format!("for (const {} of {}) {{", binding, iterable));
                self.indent += 1;
                for inner in *body {
                    self.emit_stmt(inner);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    let value = self.emit_expr(value);
                    self.line(&format!("return {};", value));
                }
                None => self.line("return;"),
            },
            StmtKind::Break => self.line("break;"),
            StmtKind::Continue => self.line("continue;"),
            StmtKind::Try { block, handler, finalizer } => {
                self.line("try {");
                self.indent += 1;
                for inner in *block {
                    self.emit_stmt(inner);
                }
                self.indent -= 1;
                if let Some(handler) = handler {
                    match handler.param {
                        Some(param) => {
                            let param = self.name(param).to_string();
                            self.line(&format!("}} catch ({}) {{", param));
                        }
                        None => self.line("} catch {"),
                    }
                    self.indent += 1;
                    for inner in handler.body {
                        self.emit_stmt(inner);
                    }
                    self.indent -= 1;
                }
                if let Some(finalizer) = finalizer {
                    self.line("} finally {");
                    self.indent += 1;
                    for inner in *finalizer {
                        self.emit_stmt(inner);
                    }
                    self.indent -= 1;
                }
                self.line("}");
            }
            StmtKind::Throw(value) => {
                let value = self.emit_expr(value);
                self.line(&format!("throw {};", value));
            }
            StmtKind::PatternMatch { arms, .. } => {
                for (i, arm) in arms.iter().enumerate() {
                    let guard = self.emit_expr(arm.guard);
                    if i == 0 {
                        self.line(&format!("if ({}) {{", guard));
                    } else {
                        self.line(&format!("}} else if ({}) {{", guard));
                    }
                    self.indent += 1;
                    for inner in arm.body {
                        self.emit_stmt(inner);
                    }
                    // Inside a function the first matching arm completes it.
                    let already_returns =
                        matches!(arm.body.last().map(|s| &s.kind), Some(StmtKind::Return(_)));
                    if self.fn_depth > 0 && !already_returns {
                        self.line("return;");
                    }
                    self.indent -= 1;
                }
                self.line("}");
            }
            StmtKind::Print(args) => {
                let args: Vec<String> = args.iter().map(|arg| self.emit_expr(arg)).collect();
                self.line(&format!("console.log({});", args.join(", ")));
            }
            StmtKind::Expression(expr) => match &expr.kind {
                ExprKind::Flow { target, functions } => {
                    let arrow = self.flow_arrow(functions);
                    let target = self.name(*target).to_string();
                    self.line(&format!("const {} = {};", target, arrow));
                }
                _ => {
                    let rendered = self.emit_expr(expr);
                    self.line(&format!("{};", rendered));
                }
            },
            StmtKind::TestBlock { name, body } => {
                let label = js_string_literal(self.name(*name));
                self.line(&format!("_test({}, () => {{", label));
                self.emit_function_body(body);
                self.line("});");
            }
            StmtKind::DescribeBlock { name, body } => {
                let label = js_string_literal(self.name(*name));
                self.line(&format!("_describe({}, () => {{", label));
                self.indent += 1;
                for inner in *body {
                    self.emit_stmt(inner);
                }
                self.indent -= 1;
                self.line("});");
            }
            StmtKind::ExpectStmt { actual, matcher, expected } => {
                let actual = self.emit_expr(actual);
                let matcher = self.name(*matcher).to_string();
                let expected = match expected {
                    Some(expected) => self.emit_expr(expected),
                    None => String::new(),
                };
                self.line(&format!("_expect({}).{}({});", actual, matcher, expected));
            }
            StmtKind::AssertStmt { test, message } => {
                let test = self.emit_expr(test);
                match message {
                    Some(message) => {
                        let message = self.emit_expr(message);
                        self.line(&format!("_assert({}, {});", test, message));
                    }
                    None => self.line(&format!("_assert({});", test)),
                }
            }
        }
    }

    fn emit_if(
        &mut self,
        test: &Expr<'_>,
        consequent: Block<'_>,
        alternate: Option<&Stmt<'_>>,
        prefix: &str,
    ) {
        let test = self.emit_expr(test);
        self.line(&format!("{}if ({}) {{", prefix, test));
        self.indent += 1;
        for inner in consequent {
            self.emit_stmt(inner);
        }
        self.indent -= 1;
        match alternate {
            None => self.line("}"),
            Some(stmt) => match &stmt.kind {
                StmtKind::If { test, consequent, alternate } => {
                    self.emit_if(test, consequent, alternate.as_deref(), "} else ");
                }
                StmtKind::Block(body) => {
                    self.line("} else {");
                    self.indent += 1;
                    for inner in *body {
                        self.emit_stmt(inner);
                    }
                    self.indent -= 1;
                    self.line("}");
                }
                _ => {
                    self.line("} else {");
                    self.indent += 1;
                    self.emit_stmt(stmt);
                    self.indent -= 1;
                    self.line("}");
                }
            },
        }
    }

    fn emit_function_body(&mut self, body: Block<'_>) {
        self.indent += 1;
        self.fn_depth += 1;
        for inner in body {
            self.emit_stmt(inner);
        }
        self.fn_depth -= 1;
        self.indent -= 1;
    }

    fn param_list(&self, params: &[Symbol]) -> String {
        params
            .iter()
            .map(|p| self.name(*p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Memoized functions cache on `JSON.stringify(arguments)`: equal
    /// keys execute the body once.
    fn emit_memo_function(&mut self, name: Symbol, params: &[Symbol], body: Block<'_>, is_async: bool) {
        let name = self.name(name).to_string();
        let params = self.param_list(params);
        let keyword = if is_async { "async function" } else { "function" };
        self.line(&format!("const {} = (() => {{", name));
        self.indent += 1;
        self.line("const _cache = new Map();");
        self.line(&format!("const _fn = {} ({}) {{", keyword, params));
        self.emit_function_body(body);
        self.line("};");
        self.line("return function () {");
        self.indent += 1;
        self.line("const _key = JSON.stringify(arguments);");
        self.line("if (_cache.has(_key)) { return _cache.get(_key); }");
        self.line("const _value = _fn.apply(this, arguments);");
        self.line("_cache.set(_key, _value);");
        self.line("return _value;");
        self.indent -= 1;
        self.line("};");
        self.indent -= 1;
        self.line("})();");
    }

    fn flow_arrow(&self, functions: &[Symbol]) -> String {
        let mut call = format!("{}(..._args)", self.name(functions[0]));
        for function in &functions[1..] {
            call = format!("{}({})", self.name(*function), call);
        }
        format!("(..._args) => {}", call)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr<'_>) -> String {
        match &expr.kind {
            ExprKind::Number(raw) => self.name(*raw).to_string(),
            ExprKind::Str(value) => js_string_literal(self.name(*value)),
            ExprKind::Backtick(raw) => self.name(*raw).to_string(),
            ExprKind::Bool(value) => value.to_string(),
            ExprKind::Null => "null".to_string(),
            ExprKind::Regex { pattern, flags } => {
                format!("/{}/{}", self.name(*pattern), self.name(*flags))
            }
            ExprKind::Template { parts, exprs } => {
                let mut out = String::from("`");
                for (i, part) in parts.iter().enumerate() {
                    out.push_str(&template_escape(self.name(*part)));
                    if let Some(inner) = exprs.get(i) {
                        let rendered = self.emit_expr(inner);
                        out.push_str("${");
                        out.push_str(&rendered);
                        out.push('}');
                    }
                }
                out.push('`');
                out
            }
            ExprKind::Identifier(name) => self.name(*name).to_string(),
            ExprKind::Member { object, property } => {
                let object_text = self.emit_expr(object);
                match property {
                    MemberProp::Name(name) => format!("{}?.{}", object_text, self.name(*name)),
                    MemberProp::Computed(index) => {
                        let index = self.emit_expr(index);
                        format!("{}?.[{}]", object_text, index)
                    }
                }
            }
            ExprKind::Call { callee, args } => {
                let callee = self.emit_expr(callee);
                let args: Vec<String> = args.iter().map(|arg| self.emit_expr(arg)).collect();
                format!("{}({})", callee, args.join(", "))
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.emit_expr(operand);
                let op = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                };
                format!("({}{})", op, operand)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.emit_expr(left);
                let right = self.emit_expr(right);
                match op {
                    BinaryOp::Is => format!("({}?._id === {}?._id)", left, right),
                    BinaryOp::IsNot => format!("({}?._id !== {}?._id)", left, right),
                    _ => format!("({} {} {})", left, js_binary_op(*op), right),
                }
            }
            ExprKind::Assign { op, target, value } => {
                let target = self.emit_expr(target);
                let value = self.emit_expr(value);
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::Add => "+=",
                    AssignOp::Sub => "-=",
                    AssignOp::Mul => "*=",
                    AssignOp::Div => "/=",
                };
                format!("({} {} {})", target, op, value)
            }
            ExprKind::Conditional { test, consequent, alternate } => {
                let test = self.emit_expr(test);
                let consequent = self.emit_expr(consequent);
                let alternate = self.emit_expr(alternate);
                format!("({} ? {} : {})", test, consequent, alternate)
            }
            ExprKind::Arrow { params, body } => {
                let params = self.param_list(params);
                match body {
                    ArrowBody::Expr(inner) => {
                        let rendered = self.emit_expr(inner);
                        // Object-literal bodies read as blocks without parens.
                        if matches!(inner.kind, ExprKind::Object(_)) {
                            format!("({}) => ({})", params, rendered)
                        } else {
                            format!("({}) => {}", params, rendered)
                        }
                    }
                    ArrowBody::Block(stmts) => {
                        let closing = self.indent_str();
                        let body_text = self.capture(|emitter| {
                            emitter.indent += 1;
                            emitter.fn_depth += 1;
                            for inner in *stmts {
                                emitter.emit_stmt(inner);
                            }
                            emitter.fn_depth -= 1;
                            emitter.indent -= 1;
                        });
                        format!("({}) => {{\n{}{}}}", params, body_text, closing)
                    }
                }
            }
            ExprKind::Array(elements) => {
                let rendered: Vec<String> =
                    elements.iter().map(|element| self.emit_expr(element)).collect();
                format!("[{}]", rendered.join(", "))
            }
            ExprKind::Object(props) => {
                if props.is_empty() {
                    return "{}".to_string();
                }
                let rendered: Vec<String> = props
                    .iter()
                    .map(|prop| match prop {
                        ObjectProp::Property { key, value, shorthand } => {
                            let key_text = match key {
                                PropKey::Ident(sym) => self.name(*sym).to_string(),
                                PropKey::Str(sym) => js_string_literal(self.name(*sym)),
                            };
                            if *shorthand {
                                key_text
                            } else {
                                let value = self.emit_expr(value);
                                format!("{}: {}", key_text, value)
                            }
                        }
                        ObjectProp::Spread { argument } => {
                            let argument = self.emit_expr(argument);
                            format!("...{}", argument)
                        }
                    })
                    .collect();
                format!("{{ {} }}", rendered.join(", "))
            }
            ExprKind::Spread(argument) => {
                let argument = self.emit_expr(argument);
                format!("...{}", argument)
            }
            ExprKind::Await(operand) => {
                let operand = self.emit_expr(operand);
                format!("(await {})", operand)
            }
            ExprKind::Range { start, end } => {
                let start_text = self.emit_expr(start);
                let end_text = self.emit_expr(end);
                format!(
                    "Array.from({{ length: {} - {} }}, (_, i) => {} + i)",
                    end_text, start_text, start_text
                )
            }
            ExprKind::Flow { functions, .. } => self.flow_arrow(functions),
            ExprKind::Pipe { left, right } => {
                let left = self.emit_expr(left);
                let callee = self.callee_form(right);
                format!("{}({})", callee, left)
            }
            ExprKind::JsBlock { inputs, body } => {
                let body = self.name(*body).to_string();
                if inputs.is_empty() {
                    format!("(() => {{ {} }})()", body)
                } else {
                    let inputs = self.param_list(inputs);
                    format!("(({}) => {{ {} }})({})", inputs, body, inputs)
                }
            }
            ExprKind::ShellBlock { inputs, body } => {
                let command = js_string_literal(self.name(*body));
                if inputs.is_empty() {
                    format!("_shell({}, {{}})", command)
                } else {
                    let inputs = self.param_list(inputs);
                    format!("_shell({}, {{ {} }})", command, inputs)
                }
            }
        }
    }

    /// A pipe's right side is used as a callee; anything that is not
    /// already postfix-shaped needs wrapping parens.
    fn callee_form(&mut self, expr: &Expr<'_>) -> String {
        let rendered = self.emit_expr(expr);
        match expr.kind {
            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Call { .. } => rendered,
            _ => format!("({})", rendered),
        }
    }
}

fn js_binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitOr => "|",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        // Handled before the table.
        BinaryOp::Is | BinaryOp::IsNot => "===",
    }
}

fn exposed_names(program: &Program<'_>, interner: &Interner) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &program.body {
        match &stmt.kind {
            StmtKind::Dec { target, exposed: true, .. } => {
                for name in target.bound_names() {
                    names.push(interner.resolve(name).to_string());
                }
            }
            StmtKind::Function { name, exposed: true, .. }
            | StmtKind::EnumDecl { name, exposed: true, .. } => {
                names.push(interner.resolve(*name).to_string());
            }
            _ => {}
        }
    }
    names
}

// ----------------------------------------------------------------------
// Shell detection (the helper is only emitted when needed)
// ----------------------------------------------------------------------

fn stmt_has_shell(stmt: &Stmt<'_>) -> bool {
    let exprs: Vec<&Expr<'_>> = match &stmt.kind {
        StmtKind::Dec { init, .. } => vec![init],
        StmtKind::Function { body, .. } => return body.iter().any(stmt_has_shell),
        StmtKind::EnumDecl { .. } => vec![],
        StmtKind::Arg { default, .. } | StmtKind::Env { default, .. } => {
            default.iter().copied().collect()
        }
        StmtKind::Dep { overrides, .. } => overrides.iter().copied().collect(),
        StmtKind::Block(body) => return body.iter().any(stmt_has_shell),
        StmtKind::If { test, consequent, alternate } => {
            return expr_has_shell(test)
                || consequent.iter().any(stmt_has_shell)
                || alternate.map(|stmt| stmt_has_shell(stmt)).unwrap_or(false)
        }
        StmtKind::While { test, body } => {
            return expr_has_shell(test) || body.iter().any(stmt_has_shell)
        }
        StmtKind::ForIn { iterable, body, .. } => {
            return expr_has_shell(iterable) || body.iter().any(stmt_has_shell)
        }
        StmtKind::Return(value) => value.iter().copied().collect(),
        StmtKind::Break | StmtKind::Continue => vec![],
        StmtKind::Try { block, handler, finalizer } => {
            return block.iter().any(stmt_has_shell)
                || handler
                    .as_ref()
                    .map(|h| h.body.iter().any(stmt_has_shell))
                    .unwrap_or(false)
                || finalizer
                    .map(|f| f.iter().any(stmt_has_shell))
                    .unwrap_or(false)
        }
        StmtKind::Throw(value) => vec![value],
        StmtKind::PatternMatch { arms, .. } => {
            return arms
                .iter()
                .any(|arm| expr_has_shell(arm.guard) || arm.body.iter().any(stmt_has_shell))
        }
        StmtKind::Print(args) => args.to_vec(),
        StmtKind::Expression(expr) => vec![expr],
        StmtKind::TestBlock { body, .. } | StmtKind::DescribeBlock { body, .. } => {
            return body.iter().any(stmt_has_shell)
        }
        StmtKind::ExpectStmt { actual, expected, .. } => {
            let mut exprs = vec![*actual];
            exprs.extend(expected.iter().copied());
            exprs
        }
        StmtKind::AssertStmt { test, message } => {
            let mut exprs = vec![*test];
            exprs.extend(message.iter().copied());
            exprs
        }
    };
    exprs.into_iter().any(expr_has_shell)
}

fn expr_has_shell(expr: &Expr<'_>) -> bool {
    match &expr.kind {
        ExprKind::ShellBlock { .. } => true,
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Backtick(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Regex { .. }
        | ExprKind::Identifier(_)
        | ExprKind::Flow { .. }
        | ExprKind::JsBlock { .. } => false,
        ExprKind::Template { exprs, .. } => exprs.iter().copied().any(expr_has_shell),
        ExprKind::Member { object, property } => {
            expr_has_shell(object)
                || matches!(property, MemberProp::Computed(index) if expr_has_shell(index))
        }
        ExprKind::Call { callee, args } => {
            expr_has_shell(callee) || args.iter().copied().any(expr_has_shell)
        }
        ExprKind::Unary { operand, .. } => expr_has_shell(operand),
        ExprKind::Binary { left, right, .. } => expr_has_shell(left) || expr_has_shell(right),
        ExprKind::Assign { target, value, .. } => expr_has_shell(target) || expr_has_shell(value),
        ExprKind::Conditional { test, consequent, alternate } => {
            expr_has_shell(test) || expr_has_shell(consequent) || expr_has_shell(alternate)
        }
        ExprKind::Arrow { body, .. } => match body {
            ArrowBody::Expr(inner) => expr_has_shell(inner),
            ArrowBody::Block(stmts) => stmts.iter().any(stmt_has_shell),
        },
        ExprKind::Array(elements) => elements.iter().copied().any(expr_has_shell),
        ExprKind::Object(props) => props.iter().any(|prop| match prop {
            ObjectProp::Property { value, .. } => expr_has_shell(value),
            ObjectProp::Spread { argument } => expr_has_shell(argument),
        }),
        ExprKind::Spread(argument) => expr_has_shell(argument),
        ExprKind::Await(operand) => expr_has_shell(operand),
        ExprKind::Range { start, end } => expr_has_shell(start) || expr_has_shell(end),
        ExprKind::Pipe { left, right } => expr_has_shell(left) || expr_has_shell(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::AstArena;
    use crate::ast::AstContext;
    use crate::intern::Interner;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn generate_source(source: &str) -> String {
        let mut interner = Interner::new();
        let tokens = Lexer::new(source, &mut interner)
            .tokenize()
            .expect("scan should succeed");
        let arena = AstArena::new();
        let ctx = AstContext::new(&arena);
        let mut parser = Parser::new(tokens, &mut interner, ctx);
        let program = parser.parse_program().expect("parse should succeed");
        generate(&program, &interner)
    }

    #[test]
    fn dec_wraps_initializer_in_deep_freeze() {
        let js = generate_source("dec x = 0xFF");
        assert!(js.contains("const x = _deepFreeze(0xFF);"), "{js}");
    }

    #[test]
    fn function_bodies_parenthesize_binaries() {
        let js = generate_source("fn add(a, b) { return a + b }");
        assert!(js.contains("function add(a, b) {"), "{js}");
        assert!(js.contains("return (a + b);"), "{js}");
    }

    #[test]
    fn range_emits_array_from() {
        let js = generate_source("dec sum = 0..5");
        assert!(
            js.contains("Array.from({ length: 5 - 0 }, (_, i) => 0 + i)"),
            "{js}"
        );
    }

    #[test]
    fn pipe_emits_nested_calls() {
        let js = generate_source("dec r = 5 ~> double ~> addOne");
        assert!(js.contains("addOne(double(5))"), "{js}");
    }

    #[test]
    fn flow_emits_composed_binding() {
        let js = generate_source("transform >> addOne double");
        assert!(
            js.contains("const transform = (..._args) => double(addOne(..._args));"),
            "{js}"
        );
    }

    #[test]
    fn enum_values_auto_increment_with_reset() {
        let js = generate_source("enum C { A, B = 10, C }");
        assert!(js.contains("Object.freeze({ A: 0, B: 10, C: 11 })"), "{js}");
    }

    #[test]
    fn member_chains_are_null_safe() {
        let js = generate_source("dec v = a.b.c");
        assert!(js.contains("a?.b?.c"), "{js}");
    }

    #[test]
    fn computed_access_is_null_safe() {
        let js = generate_source("dec v = rows[0]");
        assert!(js.contains("rows?.[0]"), "{js}");
    }

    #[test]
    fn equality_strictens() {
        let js = generate_source("dec ok = a == b\ndec not_ok = a != b");
        assert!(js.contains("(a === b)"), "{js}");
        assert!(js.contains("(a !== b)"), "{js}");
    }

    #[test]
    fn is_compares_identity_tags() {
        let js = generate_source("dec same = e is NotFound");
        assert!(js.contains("(e?._id === NotFound?._id)"), "{js}");
    }

    #[test]
    fn numeric_radix_survives_emission() {
        let js = generate_source("dec mask = 0b1010\ndec big = 1.5e3");
        assert!(js.contains("0b1010"), "{js}");
        assert!(js.contains("1.5e3"), "{js}");
    }

    #[test]
    fn secret_dec_wraps_before_freezing() {
        let js = generate_source("secret dec k = \"s\"");
        assert!(js.contains("const k = _deepFreeze(_secret(\"s\"));"), "{js}");
    }

    #[test]
    fn destructured_dec_freezes_the_source_object() {
        let js = generate_source("dec { a, b: wide } = source");
        assert!(js.contains("const { a, b: wide } = _deepFreeze(source);"), "{js}");
    }

    #[test]
    fn array_destructure_keeps_holes() {
        let js = generate_source("dec [x, , y] = triple");
        assert!(js.contains("const [x, , y] = _deepFreeze(triple);"), "{js}");
    }

    #[test]
    fn memo_function_caches_on_stringified_arguments() {
        let js = generate_source("memo fn slow(n) { return n * 2 }");
        assert!(js.contains("const slow = (() => {"), "{js}");
        assert!(js.contains("JSON.stringify(arguments)"), "{js}");
        assert!(js.contains("_cache.has(_key)"), "{js}");
    }

    #[test]
    fn template_literal_interpolates() {
        let js = generate_source(r#"dec s = "sum: ${a + b}!""#);
        assert!(js.contains("`sum: ${(a + b)}!`"), "{js}");
    }

    #[test]
    fn template_escapes_backticks() {
        let js = generate_source(r#"dec s = "a `tick` ${x}""#);
        assert!(js.contains("\\`tick\\`"), "{js}");
    }

    #[test]
    fn module_wrapper_and_preamble() {
        let js = generate_source("expose dec answer = 42");
        assert!(js.contains("__kimchi_runtime__"), "{js}");
        assert!(js.contains("export default function(_opts = {}) {"), "{js}");
        assert!(js.contains("return { answer };"), "{js}");
    }

    #[test]
    fn dep_imports_and_resolution() {
        let js = generate_source("as mailer dep services.mail({ retries: 3 })");
        assert!(js.contains("import _dep_mailer from './services/mail.km';"), "{js}");
        assert!(
            js.contains("const mailer = _opts[\"services.mail\"] || _dep_mailer({ retries: 3 });"),
            "{js}"
        );
    }

    #[test]
    fn required_arg_check_and_extraction() {
        let js = generate_source("arg !apiUrl\narg retries = 3");
        assert!(
            js.contains("if (_opts[\"apiUrl\"] === undefined)"),
            "{js}"
        );
        assert!(
            js.contains("const retries = _opts[\"retries\"] !== undefined ? _opts[\"retries\"] : 3;"),
            "{js}"
        );
    }

    #[test]
    fn secret_arg_wraps_in_secret() {
        let js = generate_source("secret arg token");
        assert!(js.contains("const token = _secret("), "{js}");
    }

    #[test]
    fn env_extraction_reads_process_env() {
        let js = generate_source("env PORT = 3000");
        assert!(js.contains("process.env[\"PORT\"]"), "{js}");
    }

    #[test]
    fn pattern_match_in_function_returns_per_arm() {
        let js = generate_source(
            "fn grade(s) {\n  | s > 90 | => print \"A\"\n  | s > 80 | => print \"B\"\n}",
        );
        assert!(js.contains("if ((s > 90)) {"), "{js}");
        assert!(js.contains("} else if ((s > 80)) {"), "{js}");
        assert!(js.contains("return;"), "{js}");
    }

    #[test]
    fn top_level_pattern_match_has_no_returns() {
        let js = generate_source("| ready | => print \"go\"");
        assert!(js.contains("if (ready) {"), "{js}");
        assert!(!js.contains("return;"), "{js}");
    }

    #[test]
    fn js_block_becomes_iife() {
        let js = generate_source("dec v = js(a) { return a * 2; }");
        assert!(js.contains("((a) => { return a * 2 ; })(a)"), "{js}");
    }

    #[test]
    fn shell_block_calls_helper_and_pulls_it_in() {
        let js = generate_source("dec out = shell(host) { ping -c 1 $host }");
        assert!(js.contains("_shell(\"ping -c 1 $host\", { host })"), "{js}");
        assert!(js.contains("spawnSync"), "{js}");
    }

    #[test]
    fn shell_helper_is_omitted_without_shell_blocks() {
        let js = generate_source("dec x = 1");
        assert!(!js.contains("spawnSync"), "{js}");
    }

    #[test]
    fn test_harness_nodes() {
        let js = generate_source(
            "describe \"math\" {\n  test \"adds\" {\n    expect add(1, 2) toEqual 3\n    assert true, \"sane\"\n  }\n}",
        );
        assert!(js.contains("_describe(\"math\", () => {"), "{js}");
        assert!(js.contains("_test(\"adds\", () => {"), "{js}");
        assert!(js.contains("_expect(add(1, 2)).toEqual(3);"), "{js}");
        assert!(js.contains("_assert(true, \"sane\");"), "{js}");
    }

    #[test]
    fn elif_chain_emits_else_if() {
        let js = generate_source("if a { print 1 } elif b { print 2 } else { print 3 }");
        assert!(js.contains("} else if (b) {"), "{js}");
        assert!(js.contains("} else {"), "{js}");
    }

    #[test]
    fn no_optional_chain_next_to_non_member_operators() {
        let js = generate_source("dec v = a.b + c.d");
        for window in ["+?.", "?.+", "??. ", " ?.("] {
            assert!(!js.contains(window), "{js}");
        }
    }

    #[test]
    fn async_function_and_await() {
        let js = generate_source("async fn fetchIt(url) { return await fetch(url) }");
        assert!(js.contains("async function fetchIt(url) {"), "{js}");
        assert!(js.contains("return (await fetch(url));"), "{js}");
    }
}
