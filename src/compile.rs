//! End-to-end compilation pipeline:
//! scan → parse → dep arity → type check → lint → emit.
//! Each stage short-circuits on failure and returns the diagnostics
//! gathered so far.

use std::collections::HashSet;

use log::debug;

use crate::arena::AstArena;
use crate::ast::{AstContext, ExprKind, ObjectProp, Program, StmtKind};
use crate::check::TypeChecker;
use crate::codegen::generate;
use crate::error::{CompileFailure, Diagnostic, DiagnosticKind};
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::lint::{lint, LintOptions, Severity};
use crate::parser::Parser;
use crate::registry::ExportRegistry;
use crate::token::Pos;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub debug: bool,
    pub skip_type_check: bool,
    pub skip_lint: bool,
    pub lint_options: LintOptions,
    /// Dotted module path; with one, a clean check publishes this
    /// module's export shape to the registry.
    pub module_path: Option<String>,
}

/// A compiler sharing one export registry across compiles. Clones of the
/// registry see each other's published modules.
#[derive(Clone, Default)]
pub struct Compiler {
    registry: ExportRegistry,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: ExportRegistry) -> Self {
        Compiler { registry }
    }

    pub fn registry(&self) -> &ExportRegistry {
        &self.registry
    }

    pub fn compile(&self, source: &str, options: &CompileOptions) -> Result<String, CompileFailure> {
        compile_with(source, options, &self.registry)
    }
}

/// Single-file convenience: compiles against a throwaway registry.
pub fn compile(source: &str, options: &CompileOptions) -> Result<String, CompileFailure> {
    compile_with(source, options, &ExportRegistry::new())
}

pub fn compile_with(
    source: &str,
    options: &CompileOptions,
    registry: &ExportRegistry,
) -> Result<String, CompileFailure> {
    if options.debug {
        debug!(
            "compiling module {}",
            options.module_path.as_deref().unwrap_or("<anonymous>")
        );
    }

    let mut interner = Interner::new();
    let tokens = Lexer::new(source, &mut interner)
        .tokenize()
        .map_err(CompileFailure::single)?;
    debug!("scanned {} tokens", tokens.len());

    let arena = AstArena::new();
    let ctx = AstContext::new(&arena);
    let mut parser = Parser::new(tokens, &mut interner, ctx);
    let program = parser.parse_program().map_err(CompileFailure::single)?;
    debug!("parsed {} top-level statements", program.body.len());

    let arity = validate_dep_arity(&program, &interner, registry);
    if !arity.is_empty() {
        return Err(CompileFailure::new(arity));
    }

    if !options.skip_type_check {
        let checker = TypeChecker::new(&interner, registry);
        let diagnostics = checker.check(&program, options.module_path.as_deref());
        debug!("type check produced {} diagnostic(s)", diagnostics.len());
        if !diagnostics.is_empty() {
            return Err(CompileFailure::new(diagnostics));
        }
    }

    if !options.skip_lint {
        let messages = lint(&program, &interner, &options.lint_options);
        debug!("lint produced {} message(s)", messages.len());
        let fatal: Vec<Diagnostic> = messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .map(|m| {
                Diagnostic::new(
                    DiagnosticKind::Lint,
                    Pos::new(m.line, m.column),
                    format!("{} [{}]", m.message, m.rule),
                )
            })
            .collect();
        if !fatal.is_empty() {
            return Err(CompileFailure::new(fatal));
        }
    }

    let output = generate(&program, &interner);
    debug!("emitted {} bytes", output.len());
    Ok(output)
}

/// Every `DepStmt` whose target is registered must cover the target's
/// required args in its override object.
fn validate_dep_arity(
    program: &Program<'_>,
    interner: &Interner,
    registry: &ExportRegistry,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for stmt in &program.body {
        let StmtKind::Dep { path, overrides, .. } = &stmt.kind else {
            continue;
        };
        let dotted = path
            .iter()
            .map(|s| interner.resolve(*s))
            .collect::<Vec<_>>()
            .join(".");
        let Some(exports) = registry.exports_of(&dotted) else {
            continue;
        };
        let mut provided: HashSet<&str> = HashSet::new();
        if let Some(overrides) = overrides {
            if let ExprKind::Object(props) = &overrides.kind {
                for prop in props {
                    if let ObjectProp::Property { key, .. } = prop {
                        provided.insert(key.text(interner));
                    }
                }
            }
        }
        for required in &exports.required_args {
            if !provided.contains(required.as_str()) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Compile,
                    stmt.pos,
                    format!(
                        "missing required argument '{}' for module '{}'",
                        required, dotted
                    ),
                ));
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> String {
        compile(source, &CompileOptions::default()).expect("should compile")
    }

    fn compile_err(source: &str) -> CompileFailure {
        compile(source, &CompileOptions::default()).expect_err("should fail")
    }

    #[test]
    fn hex_literal_survives_to_the_output() {
        let js = compile_ok("dec x = 0xFF");
        assert!(js.contains("const x = _deepFreeze(0xFF);"), "{js}");
    }

    #[test]
    fn function_emission() {
        let js = compile_ok("fn add(a, b) { return a + b }\nprint add(1, 2)");
        assert!(js.contains("function add(a, b) {"), "{js}");
        assert!(js.contains("return (a + b);"), "{js}");
    }

    #[test]
    fn range_emission() {
        let js = compile_ok("dec sum = 0..5\nprint sum");
        assert!(
            js.contains("Array.from({ length: 5 - 0 }, (_, i) => 0 + i)"),
            "{js}"
        );
    }

    #[test]
    fn pipe_emission() {
        let js = compile_ok(
            "fn double(x) { return x * 2 }\nfn addOne(x) { return x + 1 }\ndec r = 5 ~> double ~> addOne\nprint r",
        );
        assert!(js.contains("addOne(double(5))"), "{js}");
    }

    #[test]
    fn flow_emission() {
        let js = compile_ok(
            "fn double(x) { return x * 2 }\nfn addOne(x) { return x + 1 }\ntransform >> addOne double\nprint transform(1)",
        );
        assert!(
            js.contains("const transform = (..._args) => double(addOne(..._args));"),
            "{js}"
        );
    }

    #[test]
    fn secret_logged_to_console_fails_the_compile() {
        let failure = compile_err("secret dec k = \"s\"\njs(k) { console.log(k); }");
        let message = &failure.diagnostics[0].message;
        assert!(message.contains("'k'"), "{message}");
    }

    #[test]
    fn secret_used_without_console_compiles() {
        let js = compile_ok("secret dec k = \"s\"\njs(k) { send(k); }");
        assert!(js.contains("_secret(\"s\")"), "{js}");
    }

    #[test]
    fn nested_reassignment_of_dec_binding_fails() {
        let failure = compile_err("dec obj = { foo: { bar: \"b\" } }\nobj.foo.bar = \"x\"");
        assert!(
            failure.diagnostics[0]
                .message
                .contains("Cannot reassign 'obj.foo.bar'"),
            "{}",
            failure.diagnostics[0].message
        );
    }

    #[test]
    fn enum_emission_with_value_reset() {
        let js = compile_ok("enum C { A, B = 10, C }\nprint C.A");
        assert!(js.contains("{ A: 0, B: 10, C: 11 }"), "{js}");
    }

    #[test]
    fn scan_errors_short_circuit() {
        let failure = compile_err("dec a = 1 & 2");
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].to_string().starts_with("ScanError at 1:"));
    }

    #[test]
    fn type_errors_accumulate() {
        let failure = compile_err("dec a = missing\ndec b = alsoMissing");
        assert_eq!(failure.diagnostics.len(), 2);
        for diagnostic in &failure.diagnostics {
            assert!(diagnostic.to_string().starts_with("TypeError at "));
        }
    }

    #[test]
    fn skip_type_check_lets_unresolved_names_through() {
        let options = CompileOptions { skip_type_check: true, ..Default::default() };
        let result = compile("dec a = missing\nprint a", &options);
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn duplicate_key_is_promoted_to_a_fatal_lint_error() {
        let failure = compile_err("dec o = { a: 1, a: 2 }\nprint o");
        assert!(
            failure.diagnostics[0].to_string().contains("duplicate object key"),
            "{}",
            failure.diagnostics[0]
        );
    }

    #[test]
    fn lint_warnings_do_not_fail_the_compile() {
        // Unused variable is a warning, not an error.
        let js = compile_ok("dec unused = 1");
        assert!(js.contains("const unused"), "{js}");
    }

    #[test]
    fn cross_module_registry_round_trip() {
        let compiler = Compiler::new();

        let provider = CompileOptions {
            module_path: Some("pkg.mod".to_string()),
            ..Default::default()
        };
        compiler
            .compile("expose dec foo = \"hello\"\narg !bar", &provider)
            .expect("provider should compile");

        let consumer = "as remote dep pkg.mod({ bar: 42, foo: \"x\" })\nprint remote.foo";
        let js = compiler
            .compile(consumer, &CompileOptions::default())
            .expect("consumer should compile");
        assert!(js.contains("import _dep_remote from './pkg/mod.km';"), "{js}");
    }

    #[test]
    fn missing_required_arg_at_dep_callsite() {
        let compiler = Compiler::new();
        let provider = CompileOptions {
            module_path: Some("pkg.mod".to_string()),
            ..Default::default()
        };
        compiler
            .compile("expose dec foo = \"hello\"\narg !bar", &provider)
            .expect("provider should compile");

        let failure = compiler
            .compile("as remote dep pkg.mod\nprint remote.foo", &CompileOptions::default())
            .expect_err("missing arg should fail");
        let rendered = failure.diagnostics[0].to_string();
        assert!(rendered.starts_with("CompileError at "), "{rendered}");
        assert!(rendered.contains("missing required argument 'bar'"), "{rendered}");
    }

    #[test]
    fn registry_clear_forgets_modules() {
        let compiler = Compiler::new();
        let provider = CompileOptions {
            module_path: Some("pkg.mod".to_string()),
            ..Default::default()
        };
        compiler
            .compile("expose dec foo = 1\narg !bar", &provider)
            .expect("provider should compile");
        compiler.registry().clear();

        // With the registry empty the dep binds `any` and arity is not
        // enforced.
        let js = compiler
            .compile("as remote dep pkg.mod\nprint remote.foo", &CompileOptions::default())
            .expect("should compile after clear");
        assert!(js.contains("_dep_remote()"), "{js}");
    }

    #[test]
    fn memoized_function_pipeline() {
        let js = compile_ok("memo fn fib(n) { return n }\nprint fib(9)");
        assert!(js.contains("JSON.stringify(arguments)"), "{js}");
    }
}
