//! The typed tree: declarations, expressions, statements and labels.
//!
//! Nodes are arena-allocated and immutable once built, except for the
//! completion cells that C requires to be patched after the fact: a
//! function declaration's body, an incomplete array's bound, and the
//! target of a forward `goto`. Construction-time semantic checking
//! lives in [`crate::sema`]; the definitions here are plain data.

mod decl;
mod expr;
mod stmt;

pub use decl::{Decl, DeclKind, FuncDecl};
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp, Value};
pub use stmt::{CompoundStmt, Jump, LabelStmt, Stmt};
