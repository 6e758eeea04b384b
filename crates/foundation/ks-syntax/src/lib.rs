//! Tokens and syntax tree for Kestrel
//!
//! The lexer and macros both produce [`TokenStream`]s; the parser turns them
//! into the item tree defined in [`ast`]. Function and constant bodies are
//! stored in arenas so a pending macro invocation can be replaced in place.

pub mod ast;
pub mod pretty;
pub mod token;

pub use ast::{
    BinaryOp, Body, ConstDecl, Expr, ExprId, FnDecl, Item, ItemKind, LiteralKind, MacroCall,
    ModContent, ModDecl, Param, Path, PathSegment, SourceFile, Stmt, StmtId, TemplatePart,
    UnaryOp, UseEntry, Visibility,
};
pub use pretty::Printer;
pub use token::{
    Delimiter, Keyword, Punct, Token, TokenKind, TokenStream, format_byte, format_float,
};
