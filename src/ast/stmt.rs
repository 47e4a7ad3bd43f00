use super::Expr;
use crate::intern::Symbol;
use crate::token::Pos;

/// A block is an arena slice of statements.
pub type Block<'a> = &'a [Stmt<'a>];

#[derive(Debug)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub pos: Pos,
}

/// Binding target of a `dec`: a scalar name or a destructure pattern,
/// never both.
#[derive(Debug)]
pub enum DecTarget {
    Name(Symbol),
    /// `{ a, b: x }` — `binding` differs from `key` on rename.
    Object(Vec<PatternProp>),
    /// `[a, , b]` — holes are `None`.
    Array(Vec<Option<Symbol>>),
}

impl DecTarget {
    /// Every name the target introduces, in declaration order.
    pub fn bound_names(&self) -> Vec<Symbol> {
        match self {
            DecTarget::Name(sym) => vec![*sym],
            DecTarget::Object(props) => props.iter().map(|p| p.binding).collect(),
            DecTarget::Array(elements) => elements.iter().filter_map(|e| *e).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PatternProp {
    pub key: Symbol,
    pub binding: Symbol,
}

#[derive(Debug, Clone, Copy)]
pub struct EnumMember {
    pub name: Symbol,
    /// Explicit member values reset the auto-increment counter.
    pub value: Option<i64>,
}

#[derive(Debug)]
pub struct CatchClause<'a> {
    pub param: Option<Symbol>,
    pub body: Block<'a>,
}

#[derive(Debug)]
pub struct MatchArm<'a> {
    pub guard: &'a Expr<'a>,
    pub body: Block<'a>,
}

#[derive(Debug)]
pub enum StmtKind<'a> {
    Dec {
        target: DecTarget,
        init: &'a Expr<'a>,
        exposed: bool,
        secret: bool,
    },
    Function {
        name: Symbol,
        params: Vec<Symbol>,
        body: Block<'a>,
        is_async: bool,
        memoized: bool,
        exposed: bool,
    },
    EnumDecl {
        name: Symbol,
        members: Vec<EnumMember>,
        exposed: bool,
    },
    Arg {
        name: Symbol,
        required: bool,
        default: Option<&'a Expr<'a>>,
        secret: bool,
    },
    Env {
        name: Symbol,
        required: bool,
        default: Option<&'a Expr<'a>>,
        secret: bool,
    },
    Dep {
        alias: Symbol,
        path: Vec<Symbol>,
        overrides: Option<&'a Expr<'a>>,
    },
    Block(Block<'a>),
    If {
        test: &'a Expr<'a>,
        consequent: Block<'a>,
        /// Either a `Block` statement (`else`) or a nested `If` (`elif`).
        alternate: Option<&'a Stmt<'a>>,
    },
    While {
        test: &'a Expr<'a>,
        body: Block<'a>,
    },
    ForIn {
        binding: Symbol,
        iterable: &'a Expr<'a>,
        body: Block<'a>,
    },
    Return(Option<&'a Expr<'a>>),
    Break,
    Continue,
    Try {
        block: Block<'a>,
        handler: Option<CatchClause<'a>>,
        finalizer: Option<Block<'a>>,
    },
    Throw(&'a Expr<'a>),
    /// Ordered guards, first match wins. Inside a function body each arm
    /// implicitly returns; at top level arms fall through as `else if`.
    PatternMatch {
        arms: Vec<MatchArm<'a>>,
        is_regex: bool,
    },
    Print(Vec<&'a Expr<'a>>),
    Expression(&'a Expr<'a>),
    TestBlock {
        name: Symbol,
        body: Block<'a>,
    },
    DescribeBlock {
        name: Symbol,
        body: Block<'a>,
    },
    ExpectStmt {
        actual: &'a Expr<'a>,
        matcher: Symbol,
        expected: Option<&'a Expr<'a>>,
    },
    AssertStmt {
        test: &'a Expr<'a>,
        message: Option<&'a Expr<'a>>,
    },
}

#[derive(Debug)]
pub struct Program<'a> {
    pub body: Vec<Stmt<'a>>,
}
