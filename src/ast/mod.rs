mod expr;
mod stmt;

pub use expr::*;
pub use stmt::*;

use crate::arena::AstArena;
use crate::token::Pos;

/// Arena handle threaded through the parser. Copyable so nested parser
/// instances (template-string expressions) share the same allocations.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    arena: &'a AstArena,
}

impl<'a> AstContext<'a> {
    pub fn new(arena: &'a AstArena) -> Self {
        AstContext { arena }
    }

    pub fn expr(&self, kind: ExprKind<'a>, pos: Pos) -> &'a Expr<'a> {
        self.arena.alloc_expr(Expr { kind, pos })
    }

    pub fn alloc_stmt(&self, stmt: Stmt<'a>) -> &'a Stmt<'a> {
        self.arena.alloc_stmt(stmt)
    }

    pub fn block(&self, stmts: Vec<Stmt<'a>>) -> Block<'a> {
        self.arena.alloc_block(stmts)
    }
}
