//! KimchiLang → JavaScript compiler core.
//!
//! The pipeline is scanner → parser → checks → linter → emitter, wired
//! together by [`compile`]. Each stage is also usable in isolation
//! ([`tokenize`], [`parse`], [`generate`]) and `.static` data files have
//! their own side channel ([`parse_static_file`],
//! [`generate_static_code`]). Cross-module knowledge lives in the
//! explicit [`ExportRegistry`] context — there is no global state.

pub mod arena;
pub mod ast;
pub mod check;
pub mod codegen;
pub mod compile;
pub mod error;
pub mod intern;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod registry;
pub mod statics;
pub mod suggest;
pub mod token;

pub use check::{Shape, TypeChecker};
pub use compile::{compile, compile_with, CompileOptions, Compiler};
pub use error::{diagnostics_to_json, CompileFailure, Diagnostic, DiagnosticKind};
pub use lint::{lint, LintMessage, LintOptions, Severity};
pub use registry::{ExportRegistry, ModuleExports};
pub use statics::{generate_static_code, StaticDoc, StaticValue};

use ast::{AstContext, Program};
use intern::Interner;
use lexer::Lexer;
use parser::Parser;
use token::Token;

/// Scan source text into tokens.
pub fn tokenize(source: &str, interner: &mut Interner) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(source, interner).tokenize()
}

/// Parse a token stream into a program. The AST borrows from the arenas
/// behind `ctx`.
pub fn parse<'a>(
    tokens: Vec<Token>,
    interner: &mut Interner,
    ctx: AstContext<'a>,
) -> Result<Program<'a>, Diagnostic> {
    Parser::new(tokens, interner, ctx).parse_program()
}

/// Emit JavaScript for a parsed program.
pub fn generate(program: &Program<'_>, interner: &Interner) -> String {
    codegen::generate(program, interner)
}

/// Registry protocol: publish a module's export shape.
pub fn register_module(registry: &ExportRegistry, path: &str, exports: ModuleExports) {
    registry.register(path, exports);
}

/// Registry protocol: look up a module's published shape.
pub fn module_export_shape(registry: &ExportRegistry, path: &str) -> Option<Shape> {
    registry.shape_of(path)
}

/// Registry protocol: administrative reset used by test suites.
pub fn clear_registry(registry: &ExportRegistry) {
    registry.clear();
}

/// Parse a `.static` data file into its value tree.
pub fn parse_static_file(text: &str) -> Result<StaticDoc, Diagnostic> {
    statics::parse_static(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::AstArena;

    #[test]
    fn staged_pipeline_matches_compile() {
        let source = "expose dec answer = 42";
        let mut interner = Interner::new();
        let tokens = tokenize(source, &mut interner).expect("tokenize");
        let arena = AstArena::new();
        let ctx = AstContext::new(&arena);
        let program = parse(tokens, &mut interner, ctx).expect("parse");
        let staged = generate(&program, &interner);
        let compiled = compile(source, &CompileOptions::default()).expect("compile");
        assert_eq!(staged, compiled);
    }

    #[test]
    fn registry_protocol_round_trip() {
        let registry = ExportRegistry::new();
        register_module(
            &registry,
            "a.b",
            ModuleExports { shape: Shape::Any, required_args: vec![] },
        );
        assert_eq!(module_export_shape(&registry, "a.b"), Some(Shape::Any));
        clear_registry(&registry);
        assert_eq!(module_export_shape(&registry, "a.b"), None);
    }

    #[test]
    fn static_side_channel() {
        let doc = parse_static_file("Greeting \"hi\"").expect("parse static");
        let js = generate_static_code(&doc, "greetings");
        assert!(js.contains("export const Greeting = \"hi\";"), "{js}");
    }
}
