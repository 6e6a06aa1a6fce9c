// Xn AST Module

pub mod expr;
pub mod stmt;

pub use expr::{Expr, MatchCase};
pub use stmt::Stmt;

/// A parsed program: a list of top-level statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
