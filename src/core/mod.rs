pub mod ast;
pub mod errors;

pub use ast::{
    BranchKind, Decl, Expr, ExprKind, Field, FuncDecl, FuncLit, Import, SourceFile, Span, Stmt,
    UnaryOp, ValueSpec,
};
pub use errors::{Error, Result, ResultExt};
