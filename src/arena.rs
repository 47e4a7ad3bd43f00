use bumpalo::Bump;

use crate::ast::{Expr, Stmt};

/// Backing store for one compile's AST. Expressions, statements, and
/// block slices are bump-allocated side by side and referenced through
/// `&'a` pointers; the whole tree is freed at once when the compile's
/// arena drops, which is the only deallocation an AST ever needs.
pub struct AstArena {
    bump: Bump,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena { bump: Bump::new() }
    }

    pub fn alloc_expr<'a>(&'a self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(expr)
    }

    pub fn alloc_stmt<'a>(&'a self, stmt: Stmt<'a>) -> &'a Stmt<'a> {
        self.bump.alloc(stmt)
    }

    /// Blocks are slices, so a statement list stays contiguous.
    pub fn alloc_block<'a>(&'a self, stmts: Vec<Stmt<'a>>) -> &'a [Stmt<'a>] {
        self.bump.alloc_slice_fill_iter(stmts)
    }
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}
