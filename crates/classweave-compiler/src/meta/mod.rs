//! The meta stage.
//!
//! A meta-expression is code run while compiling. Code generation wraps its
//! body in a throwaway [`GeneratorUnit`], hands the unit to a
//! [`StageExecutor`] together with the class's capture buckets, converts the
//! returned [`MetaValue`] back into a syntax node and compiles that node in
//! place of the meta-expression.

mod interpreter;

pub use interpreter::{EvalError, MetaInterpreter};

use std::fmt;

use classweave_core::ast::{CodeNode, Expr, Literal, Stmt};
use classweave_core::{CompilationError, Region};

use crate::weave::{CapturedMember, Captures};

/// A compile-time program.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorUnit {
    /// `<prefix><n>`, unique within one weave.
    pub name: String,
    /// Internal name of the class being compiled.
    pub target: String,
    pub body: Stmt,
    /// Capture buckets the body may refer to.
    pub exposed: Vec<String>,
}

/// Runs generator units.
pub trait StageExecutor {
    fn execute(
        &mut self,
        unit: &GeneratorUnit,
        captures: &Captures,
    ) -> Result<MetaValue, CompilationError>;
}

/// Executor for builds with no meta stage. Every unit fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnboundStage;

impl StageExecutor for UnboundStage {
    fn execute(
        &mut self,
        unit: &GeneratorUnit,
        _captures: &Captures,
    ) -> Result<MetaValue, CompilationError> {
        Err(CompilationError::Stage {
            message: format!("no stage is bound to run {}", unit.name),
            region: unit.body.region,
        })
    }
}

/// A value computed by meta code.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Member(CapturedMember),
    List(Vec<MetaValue>),
    Node(CodeNode),
}

impl MetaValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::Null => "null",
            MetaValue::Bool(_) => "boolean",
            MetaValue::Int(_) => "int",
            MetaValue::Long(_) => "long",
            MetaValue::Float(_) => "float",
            MetaValue::Double(_) => "double",
            MetaValue::Str(_) => "String",
            MetaValue::Member(_) => "member",
            MetaValue::List(_) => "list",
            MetaValue::Node(_) => "code",
        }
    }

    /// The syntax node this value stands for in generated code.
    pub fn into_node(self, region: Region) -> Result<CodeNode, CompilationError> {
        let literal = match self {
            MetaValue::Node(node) => return Ok(node),
            MetaValue::Null => return Ok(CodeNode::Expr(Expr::null().at(region))),
            MetaValue::Bool(value) => Literal::Boolean(value),
            MetaValue::Int(value) => Literal::Int(value),
            MetaValue::Long(value) => Literal::Long(value),
            MetaValue::Float(value) => Literal::Float(value),
            MetaValue::Double(value) => Literal::Double(value),
            MetaValue::Str(value) => Literal::String(value),
            other => {
                return Err(CompilationError::Stage {
                    message: format!("a {} value has no code form", other.type_name()),
                    region,
                });
            }
        };
        Ok(CodeNode::Expr(Expr::literal(literal).at(region)))
    }

    /// Like [`MetaValue::into_node`], requiring an expression.
    pub fn into_expr(self, region: Region) -> Result<Expr, CompilationError> {
        self.into_node(region)?
            .into_expr()
            .ok_or_else(|| CompilationError::Stage {
                message: "meta code produced a statement where an expression is needed".into(),
                region,
            })
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(value) => write!(f, "{value}"),
            MetaValue::Int(value) => write!(f, "{value}"),
            MetaValue::Long(value) => write!(f, "{value}"),
            MetaValue::Float(value) => write!(f, "{value}"),
            MetaValue::Double(value) => write!(f, "{value}"),
            MetaValue::Str(value) => f.write_str(value),
            MetaValue::Member(member) => f.write_str(&member.name),
            MetaValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            MetaValue::Node(_) => f.write_str("<code>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classweave_core::ast::StmtKind;

    fn unit() -> GeneratorUnit {
        GeneratorUnit {
            name: "Generator0".into(),
            target: "demo/Target".into(),
            body: Stmt::ret(None).at(Region::new(3, 5, 6)),
            exposed: Vec::new(),
        }
    }

    #[test]
    fn unbound_stage_fails_at_the_unit() {
        let err = UnboundStage.execute(&unit(), &Captures::default()).unwrap_err();
        assert_eq!(err.region(), Some(Region::new(3, 5, 6)));
        assert!(err.to_string().contains("Generator0"));
    }

    #[test]
    fn scalars_become_literals() {
        let region = Region::new(1, 1, 1);
        assert_eq!(MetaValue::Int(3).into_expr(region).unwrap(), Expr::int(3).at(region));
        assert_eq!(
            MetaValue::Str("x".into()).into_expr(region).unwrap(),
            Expr::string("x").at(region)
        );
        assert!(MetaValue::List(vec![]).into_expr(region).is_err());
    }

    #[test]
    fn statement_nodes_are_not_expressions() {
        let node = MetaValue::Node(CodeNode::Stmt(Stmt::ret(None)));
        assert!(node.clone().into_expr(Region::SYNTHETIC).is_err());
        let CodeNode::Stmt(stmt) = node.into_node(Region::SYNTHETIC).unwrap() else {
            panic!("expected a statement");
        };
        assert!(matches!(stmt.kind, StmtKind::Return(None)));
    }

    #[test]
    fn display() {
        let list = MetaValue::List(vec![MetaValue::Int(1), MetaValue::Str("a".into())]);
        assert_eq!(list.to_string(), "[1, a]");
        assert_eq!(MetaValue::Bool(true).to_string(), "true");
    }
}
