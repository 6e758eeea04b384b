//! Syntax tree
//!
//! Items are plain owned trees. Expressions and statements live in a per-body
//! arena and refer to each other through [`ExprId`] / [`StmtId`], which lets
//! macro expansion overwrite one slot without rebuilding the body.

use crate::token::TokenStream;
use derive_more::Display;
use ks_arena::{Arena, Idx};
use ks_intern::{Interner, Symbol};
use ks_span::{FileId, FileSpan};
use std::mem;

/// Expression id inside a [`Body`]
pub type ExprId = Idx<Expr>;

/// Statement id inside a [`Body`]
pub type StmtId = Idx<Stmt>;

/// Item visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Visible everywhere (`pub`)
    Public,
    /// Visible in the defining module and its descendants
    #[default]
    Private,
}

impl Visibility {
    /// True for `pub`
    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// One segment of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Plain name
    Ident(Symbol),
    /// `crate`
    Crate,
    /// `super`
    Super,
    /// `self`
    SelfModule,
}

/// A `::`-separated path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Segments in source order
    pub segments: Vec<PathSegment>,
    /// Source location
    pub span: FileSpan,
}

impl Path {
    /// Single-identifier path
    #[must_use]
    pub fn ident(name: Symbol, span: FileSpan) -> Self {
        Self {
            segments: vec![PathSegment::Ident(name)],
            span,
        }
    }

    /// The identifier if this path is exactly one plain name
    #[must_use]
    pub fn as_ident(&self) -> Option<Symbol> {
        match self.segments.as_slice() {
            [PathSegment::Ident(name)] => Some(*name),
            _ => None,
        }
    }

    /// The last plain name in the path
    #[must_use]
    pub fn last_ident(&self) -> Option<Symbol> {
        match self.segments.last() {
            Some(PathSegment::Ident(name)) => Some(*name),
            _ => None,
        }
    }

    /// Renders the path as `a::b::c`
    #[must_use]
    pub fn display(&self, interner: &Interner) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Ident(name) => interner.resolve(name),
                PathSegment::Crate => "crate".to_string(),
                PathSegment::Super => "super".to_string(),
                PathSegment::SelfModule => "self".to_string(),
            })
            .collect::<Vec<_>>()
            .join("::")
    }
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// File the items came from
    pub file: FileId,
    /// Top-level items
    pub items: Vec<Item>,
}

/// An item with its visibility
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// `pub` or private
    pub visibility: Visibility,
    /// What the item is
    pub kind: ItemKind,
    /// Whole item span
    pub span: FileSpan,
}

/// Item kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// `fn` or `const fn`
    Fn(FnDecl),
    /// `const NAME = expr;`
    Const(ConstDecl),
    /// `mod name { .. }` or `mod name;`
    Mod(ModDecl),
    /// `use ...;`, already flattened into one entry per imported name
    Use(Vec<UseEntry>),
    /// Item-position macro invocation
    MacroCall(MacroCall),
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    /// Function name
    pub name: Symbol,
    /// Span of the name
    pub name_span: FileSpan,
    /// Declared with `const fn`
    pub is_const: bool,
    /// Parameters in order
    pub params: Vec<Param>,
    /// Function body; its root is a block
    pub body: Body,
}

/// Function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: Symbol,
    /// Span of the name
    pub span: FileSpan,
}

/// Constant declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    /// Constant name
    pub name: Symbol,
    /// Span of the name
    pub name_span: FileSpan,
    /// Initialiser expression
    pub body: Body,
}

/// Module declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ModDecl {
    /// Module name
    pub name: Symbol,
    /// Span of the name
    pub name_span: FileSpan,
    /// Inline items or a file to load
    pub content: ModContent,
}

/// Module contents
#[derive(Debug, Clone, PartialEq)]
pub enum ModContent {
    /// `mod name { items }`
    Inline(Vec<Item>),
    /// `mod name;`
    External,
}

/// One imported name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseEntry {
    /// Full path of the imported item
    pub path: Path,
    /// `as` rename
    pub alias: Option<Symbol>,
    /// Span of this entry
    pub span: FileSpan,
}

impl UseEntry {
    /// Name the import binds in its module
    #[must_use]
    pub fn binding(&self) -> Option<Symbol> {
        self.alias.or_else(|| self.path.last_ident())
    }
}

/// Macro invocation `path!(tokens)`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroCall {
    /// Path naming the macro
    pub path: Path,
    /// Tokens between the outer delimiters
    pub input: TokenStream,
    /// Whole invocation span
    pub span: FileSpan,
}

/// Expression and statement storage for one function or constant
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Expression arena
    pub exprs: Arena<Expr>,
    /// Statement arena
    pub stmts: Arena<Stmt>,
    /// Root expression
    pub root: ExprId,
}

impl Body {
    /// Creates a body whose root is a unit placeholder
    #[must_use]
    pub fn new(span: FileSpan) -> Self {
        let mut exprs = Arena::new();
        let root = exprs.alloc(Expr::Literal {
            kind: LiteralKind::Unit,
            span,
        });
        Self {
            exprs,
            stmts: Arena::new(),
            root,
        }
    }

    /// Allocates an expression
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    /// Allocates a statement
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.alloc(stmt)
    }

    /// Expression by id
    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    /// Statement by id
    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    /// Moves the expression at `from` into `into`, leaving a unit literal
    /// behind at `from`
    pub fn splice(&mut self, from: ExprId, into: ExprId) {
        let span = self.exprs[from].span();
        let node = mem::replace(
            &mut self.exprs[from],
            Expr::Literal {
                kind: LiteralKind::Unit,
                span,
            },
        );
        self.exprs[into] = node;
    }

    /// Ids of every macro invocation still present in the body
    #[must_use]
    pub fn pending_macro_calls(&self) -> Vec<ExprId> {
        self.exprs
            .iter()
            .filter(|(_, expr)| matches!(expr, Expr::MacroCall(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// True if no macro invocation remains
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.exprs
            .iter()
            .all(|(_, expr)| !matches!(expr, Expr::MacroCall(_)))
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    /// `()`
    Unit,
    /// `true` / `false`
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// Character
    Char(char),
    /// Byte; evaluates to an integer
    Byte(u8),
}

/// Piece of a template string
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text, escapes decoded
    Text(String),
    /// Embedded `{expr}`
    Expr(ExprId),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    /// `+`
    #[display("+")]
    Add,
    /// `-`
    #[display("-")]
    Sub,
    /// `*`
    #[display("*")]
    Mul,
    /// `/`
    #[display("/")]
    Div,
    /// `%`
    #[display("%")]
    Rem,
    /// `==`
    #[display("==")]
    Eq,
    /// `!=`
    #[display("!=")]
    Ne,
    /// `<`
    #[display("<")]
    Lt,
    /// `<=`
    #[display("<=")]
    Le,
    /// `>`
    #[display(">")]
    Gt,
    /// `>=`
    #[display(">=")]
    Ge,
    /// `&&`
    #[display("&&")]
    And,
    /// `||`
    #[display("||")]
    Or,
    /// `&`
    #[display("&")]
    BitAnd,
    /// `|`
    #[display("|")]
    BitOr,
    /// `^`
    #[display("^")]
    BitXor,
    /// `<<`
    #[display("<<")]
    Shl,
    /// `>>`
    #[display(">>")]
    Shr,
}

impl BinaryOp {
    /// Binding power; higher binds tighter
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 3,
            Self::BitOr => 4,
            Self::BitXor => 5,
            Self::BitAnd => 6,
            Self::Shl | Self::Shr => 7,
            Self::Add | Self::Sub => 8,
            Self::Mul | Self::Div | Self::Rem => 9,
        }
    }

    /// Comparisons do not chain
    #[must_use]
    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    /// `-`
    #[display("-")]
    Neg,
    /// `!`
    #[display("!")]
    Not,
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal {
        /// The value
        kind: LiteralKind,
        /// Source location
        span: FileSpan,
    },
    /// Template string
    Template {
        /// Text and embedded expressions in order
        parts: Vec<TemplatePart>,
        /// Source location
        span: FileSpan,
    },
    /// Variable or item path
    Path {
        /// The path
        path: Path,
        /// Source location
        span: FileSpan,
    },
    /// Function call
    Call {
        /// Called expression
        callee: ExprId,
        /// Arguments
        args: Vec<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// Method call `receiver.method(args)`
    MethodCall {
        /// Receiver
        receiver: ExprId,
        /// Method name
        method: Symbol,
        /// Arguments
        args: Vec<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// Field access `base.field`
    Field {
        /// Accessed value
        base: ExprId,
        /// Field name
        field: Symbol,
        /// Source location
        span: FileSpan,
    },
    /// Indexing `base[index]`
    Index {
        /// Indexed value
        base: ExprId,
        /// Index
        index: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: ExprId,
        /// Right operand
        rhs: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Assignment, `op` is set for compound forms like `+=`
    Assign {
        /// Compound operator
        op: Option<BinaryOp>,
        /// Assigned place
        target: ExprId,
        /// New value
        value: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Block `{ stmts; tail }`
    Block {
        /// Statements
        stmts: Vec<StmtId>,
        /// Trailing expression without semicolon
        tail: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `if cond { .. } else ..`
    If {
        /// Condition
        condition: ExprId,
        /// Then block
        then_branch: ExprId,
        /// Else block or nested `if`
        else_branch: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `while cond { .. }`
    While {
        /// Condition
        condition: ExprId,
        /// Loop body
        body: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// `loop { .. }`
    Loop {
        /// Loop body
        body: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// `break [value]`
    Break {
        /// Loop result
        value: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `continue`
    Continue {
        /// Source location
        span: FileSpan,
    },
    /// `return [value]`
    Return {
        /// Returned value
        value: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `[a, b]`
    Vec {
        /// Elements
        elements: Vec<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `(a, b)`
    Tuple {
        /// Elements
        elements: Vec<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// `#{key: value}`
    Object {
        /// Fields in source order
        fields: Vec<(Symbol, ExprId)>,
        /// Source location
        span: FileSpan,
    },
    /// Parenthesised expression
    Paren {
        /// Wrapped expression
        inner: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Expression-position macro invocation
    MacroCall(MacroCall),
}

impl Expr {
    /// Source location of the expression
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Literal { span, .. }
            | Self::Template { span, .. }
            | Self::Path { span, .. }
            | Self::Call { span, .. }
            | Self::MethodCall { span, .. }
            | Self::Field { span, .. }
            | Self::Index { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Assign { span, .. }
            | Self::Block { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::Loop { span, .. }
            | Self::Break { span, .. }
            | Self::Continue { span }
            | Self::Return { span, .. }
            | Self::Vec { span, .. }
            | Self::Tuple { span, .. }
            | Self::Object { span, .. }
            | Self::Paren { span, .. } => *span,
            Self::MacroCall(call) => call.span,
        }
    }

    /// Block-like expressions end a statement without a semicolon
    #[must_use]
    pub fn is_block_like(&self) -> bool {
        matches!(
            self,
            Self::Block { .. } | Self::If { .. } | Self::While { .. } | Self::Loop { .. }
        )
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = value;`
    Let {
        /// Bound name
        name: Symbol,
        /// Initial value
        value: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Expression statement; its value is discarded
    Expr {
        /// The expression
        expr: ExprId,
        /// Source location
        span: FileSpan,
    },
}

impl Stmt {
    /// Source location of the statement
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Let { span, .. } | Self::Expr { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_moves_node_and_leaves_unit() {
        let span = FileSpan::synthetic();
        let mut body = Body::new(span);
        let slot = body.alloc_expr(Expr::MacroCall(MacroCall {
            path: Path {
                segments: vec![PathSegment::Crate],
                span,
            },
            input: TokenStream::new(),
            span,
        }));
        let produced = body.alloc_expr(Expr::Literal {
            kind: LiteralKind::Integer(5),
            span,
        });
        assert_eq!(body.pending_macro_calls(), vec![slot]);

        body.splice(produced, slot);

        assert!(body.is_expanded());
        assert_eq!(
            body.expr(slot),
            &Expr::Literal {
                kind: LiteralKind::Integer(5),
                span
            }
        );
        assert_eq!(
            body.expr(produced),
            &Expr::Literal {
                kind: LiteralKind::Unit,
                span
            }
        );
    }

    #[test]
    fn use_binding_prefers_alias() {
        let interner = Interner::new();
        let span = FileSpan::synthetic();
        let entry = UseEntry {
            path: Path {
                segments: vec![
                    PathSegment::Ident(interner.intern("std")),
                    PathSegment::Ident(interner.intern("io")),
                ],
                span,
            },
            alias: Some(interner.intern("stdio")),
            span,
        };
        assert_eq!(entry.binding(), interner.get("stdio"));
        assert_eq!(entry.path.display(&interner), "std::io");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
        assert!(BinaryOp::Lt.is_comparison());
    }
}
