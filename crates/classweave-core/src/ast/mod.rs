//! Owned syntax tree handed over by the parser.
//!
//! Nodes own their children and never point back up. The node categories
//! are closed enums, so every pass matches exhaustively instead of visiting.

mod decl;
mod expr;
mod stmt;

pub use decl::{
    ClassDecl, FieldDecl, FieldSelector, MemberDecl, MethodDecl, MethodSelector, Module,
    Parameter,
};
pub use expr::{BinaryOp, CallTarget, Expr, ExprKind, IncDecOp, Literal, Timing, UnaryOp};
pub use stmt::{Stmt, StmtKind};

use crate::Region;

/// Any node that can appear inside method code.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeNode {
    Expr(Expr),
    Stmt(Stmt),
}

impl CodeNode {
    pub fn region(&self) -> Region {
        match self {
            CodeNode::Expr(expr) => expr.region,
            CodeNode::Stmt(stmt) => stmt.region,
        }
    }

    /// View as a statement; expressions become expression statements.
    pub fn into_stmt(self) -> Stmt {
        match self {
            CodeNode::Expr(expr) => Stmt::expr(expr),
            CodeNode::Stmt(stmt) => stmt,
        }
    }

    /// View as an expression, unwrapping an expression statement.
    pub fn into_expr(self) -> Option<Expr> {
        match self {
            CodeNode::Expr(expr) => Some(expr),
            CodeNode::Stmt(Stmt {
                kind: StmtKind::Expr(expr),
                ..
            }) => Some(expr),
            CodeNode::Stmt(_) => None,
        }
    }
}

impl From<Expr> for CodeNode {
    fn from(expr: Expr) -> Self {
        CodeNode::Expr(expr)
    }
}

impl From<Stmt> for CodeNode {
    fn from(stmt: Stmt) -> Self {
        CodeNode::Stmt(stmt)
    }
}
