//! Statement nodes.

use super::Expr;
use crate::{Region, TypeRef};

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub region: Region,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// An expression evaluated for its effect.
    Expr(Expr),
    VarDecl {
        name: String,
        ty: TypeRef,
        value: Option<Expr>,
    },
    Return(Option<Expr>),
    Block(Vec<Stmt>),
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    IfElse {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
}

impl Stmt {
    pub fn new(region: Region, kind: StmtKind) -> Self {
        Self { region, kind }
    }

    pub fn synthetic(kind: StmtKind) -> Self {
        Self::new(Region::SYNTHETIC, kind)
    }

    pub fn expr(expr: Expr) -> Self {
        let region = expr.region;
        Self::new(region, StmtKind::Expr(expr))
    }

    pub fn var(name: impl Into<String>, ty: TypeRef, value: Option<Expr>) -> Self {
        Self::synthetic(StmtKind::VarDecl {
            name: name.into(),
            ty,
            value,
        })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::synthetic(StmtKind::Return(value))
    }

    pub fn block(statements: Vec<Stmt>) -> Self {
        Self::synthetic(StmtKind::Block(statements))
    }

    pub fn while_loop(condition: Expr, body: Stmt) -> Self {
        Self::synthetic(StmtKind::While {
            condition,
            body: Box::new(body),
        })
    }

    pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Self::synthetic(StmtKind::IfElse {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn at(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Whether control cannot fall off the end of this statement.
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            StmtKind::Return(_) => true,
            StmtKind::Block(statements) => statements.last().is_some_and(Stmt::always_returns),
            StmtKind::IfElse {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_returns() && else_branch.always_returns(),
            _ => false,
        }
    }

    /// The statements of a block, or the statement itself.
    pub fn into_statements(self) -> Vec<Stmt> {
        match self.kind {
            StmtKind::Block(statements) => statements,
            _ => vec![self],
        }
    }
}
