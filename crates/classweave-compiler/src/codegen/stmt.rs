//! Statement preparation.

use classweave_core::ast::{Expr, ExprKind, Stmt, StmtKind};
use classweave_core::{CompilationError, PrimitiveKind, Region};

use super::prepared::{ExprOp, PreparedExpr, PreparedStmt};
use super::{CodeGenerator, Result};
use crate::emitter::ValueKind;

impl CodeGenerator<'_> {
    pub fn prepare_stmt(&mut self, stmt: &Stmt) -> Result<PreparedStmt> {
        let region = stmt.region;
        match &stmt.kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Meta(body),
                region: meta_region,
            }) => {
                // a meta statement may produce any node, statements included
                let value = self.run_stage(body, *meta_region)?;
                let node = value.into_node(*meta_region)?;
                self.prepare_node(&node)
            }
            StmtKind::Expr(expr) => Ok(PreparedStmt::Expr(self.prepare_expr(expr)?)),
            StmtKind::VarDecl { name, ty, value } => {
                // the initializer cannot see the variable it initializes
                let value = value.as_ref().map(|v| self.prepare_expr(v)).transpose()?;
                let local = self.declare_local(name, ty, region)?;
                let value = value
                    .map(|v| self.coerce(v, &local.ty, region))
                    .transpose()?;
                Ok(match value {
                    Some(value) => PreparedStmt::Expr(PreparedExpr::new(
                        local.ty.clone(),
                        ExprOp::Store {
                            kind: local.kind(),
                            slot: local.slot,
                            value: Box::new(value),
                        },
                    )),
                    None => PreparedStmt::Nothing,
                })
            }
            StmtKind::Return(value) => self.prepare_return(value.as_ref(), region),
            StmtKind::Block(statements) => {
                self.scope.push_scope();
                let prepared = statements
                    .iter()
                    .map(|s| self.prepare_stmt(s))
                    .collect::<Result<Vec<_>>>();
                self.scope.pop_scope();
                Ok(PreparedStmt::Block(prepared?))
            }
            StmtKind::While { condition, body } => {
                let condition = self.prepare_condition(condition)?;
                let body = self.prepare_scoped(body)?;
                Ok(PreparedStmt::While {
                    condition,
                    body: Box::new(body),
                })
            }
            StmtKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.prepare_condition(condition)?;
                let then_branch = self.prepare_scoped(then_branch)?;
                let else_branch = else_branch
                    .as_deref()
                    .map(|s| self.prepare_scoped(s))
                    .transpose()?;
                Ok(PreparedStmt::IfElse {
                    condition,
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                })
            }
        }
    }

    /// A loop or branch body gets its own scope even when it is not a block.
    fn prepare_scoped(&mut self, stmt: &Stmt) -> Result<PreparedStmt> {
        self.scope.push_scope();
        let prepared = self.prepare_stmt(stmt);
        self.scope.pop_scope();
        prepared
    }

    fn prepare_condition(&mut self, condition: &Expr) -> Result<PreparedExpr> {
        let prepared = self.prepare_expr(condition)?;
        if prepared.ty.as_primitive() != Some(PrimitiveKind::Boolean) {
            return Err(CompilationError::unsupported(
                format!("{} condition", prepared.ty),
                condition.region,
            ));
        }
        Ok(prepared)
    }

    fn prepare_return(&mut self, value: Option<&Expr>, region: Region) -> Result<PreparedStmt> {
        match (value, self.return_type.is_void()) {
            (None, true) => Ok(PreparedStmt::Return {
                value: None,
                kind: ValueKind::Void,
            }),
            (Some(value), false) => {
                let prepared = self.prepare_expr(value)?;
                let value = self.coerce(prepared, &self.return_type, value.region)?;
                Ok(PreparedStmt::Return {
                    value: Some(value),
                    kind: ValueKind::of(&self.return_type),
                })
            }
            (Some(_), true) => Err(CompilationError::unsupported(
                "returning a value from a void method",
                region,
            )),
            (None, false) => Err(CompilationError::unsupported(
                format!("'return' without a value in a method returning {}", self.return_type),
                region,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Frame;
    use super::super::tests::generate;
    use crate::emitter::{Constant, Insn, JumpCondition, Label, LocalKind, ValueKind};
    use classweave_core::ast::{BinaryOp, Expr, Literal, Stmt};
    use classweave_core::{CompilationError, PrimitiveKind, TypeRef};
    use classweave_registry::ClassRegistry;

    fn frame(return_type: TypeRef) -> Frame {
        Frame::method("demo/Target", true, return_type, Vec::new())
    }

    #[test]
    fn if_else_branches() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::if_else(
            Expr::boolean(true),
            Stmt::ret(Some(Expr::int(1))),
            Some(Stmt::ret(Some(Expr::int(2)))),
        );
        let (insns, _) = generate(&registry, frame(TypeRef::int()), &body).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Push(Constant::Int(1)),
                Insn::Jump {
                    condition: JumpCondition::IfZero,
                    target: Label(0)
                },
                Insn::Push(Constant::Int(1)),
                Insn::Return(ValueKind::Int),
                Insn::Jump {
                    condition: JumpCondition::Always,
                    target: Label(1)
                },
                Insn::Label(Label(0)),
                Insn::Push(Constant::Int(2)),
                Insn::Return(ValueKind::Int),
                Insn::Label(Label(1)),
            ]
        );
    }

    #[test]
    fn sibling_blocks_get_fresh_slots() {
        let registry = ClassRegistry::with_bootstrap();
        // { int a = 1; } { long b = 2; } int c = 3;
        let body = Stmt::block(vec![
            Stmt::block(vec![Stmt::var("a", TypeRef::int(), Some(Expr::int(1)))]),
            Stmt::block(vec![Stmt::var("b", TypeRef::long(), None)]),
            Stmt::var("c", TypeRef::int(), Some(Expr::int(3))),
            Stmt::ret(None),
        ]);
        let (insns, max_locals) = generate(&registry, frame(TypeRef::void()), &body).unwrap();
        assert_eq!(max_locals, 4);
        assert!(insns.iter().any(|i| *i
            == Insn::Store {
                kind: LocalKind::Int,
                slot: 3
            }));
    }

    #[test]
    fn out_of_scope_local_is_not_visible() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::block(vec![
            Stmt::block(vec![Stmt::var("a", TypeRef::int(), Some(Expr::int(1)))]),
            Stmt::ret(Some(Expr::lookup("a"))),
        ]);
        let err = generate(&registry, frame(TypeRef::int()), &body).unwrap_err();
        assert!(matches!(err, CompilationError::UnknownField { .. }));
    }

    #[test]
    fn initializer_cannot_see_its_variable() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::var(
            "x",
            TypeRef::int(),
            Some(Expr::binary(BinaryOp::Add, Expr::lookup("x"), Expr::int(1))),
        );
        assert!(generate(&registry, frame(TypeRef::void()), &body).is_err());
    }

    #[test]
    fn return_shape_must_match_the_method() {
        let registry = ClassRegistry::with_bootstrap();
        assert!(generate(&registry, frame(TypeRef::void()), &Stmt::ret(Some(Expr::int(1)))).is_err());
        assert!(generate(&registry, frame(TypeRef::int()), &Stmt::ret(None)).is_err());
    }

    #[test]
    fn int_return_from_a_long_method_is_widened() {
        let registry = ClassRegistry::with_bootstrap();
        let (insns, _) =
            generate(&registry, frame(TypeRef::long()), &Stmt::ret(Some(Expr::int(1)))).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Push(Constant::Int(1)),
                Insn::Convert {
                    from: ValueKind::Int,
                    to: ValueKind::Long
                },
                Insn::Return(ValueKind::Long),
            ]
        );
    }

    #[test]
    fn mistyped_return_is_rejected() {
        let registry = ClassRegistry::with_bootstrap();
        let err = generate(&registry, frame(TypeRef::int()), &Stmt::ret(Some(Expr::string("x"))))
            .unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));

        // narrowing is not implicit either
        let err = generate(
            &registry,
            frame(TypeRef::int()),
            &Stmt::ret(Some(Expr::literal(Literal::Long(1)))),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));
    }

    #[test]
    fn declarations_check_and_widen_their_initializer() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::block(vec![
            Stmt::var("d", TypeRef::Primitive(PrimitiveKind::Double), Some(Expr::int(2))),
            Stmt::ret(None),
        ]);
        let (insns, _) = generate(&registry, frame(TypeRef::void()), &body).unwrap();
        assert_eq!(
            insns[1],
            Insn::Convert {
                from: ValueKind::Int,
                to: ValueKind::Double
            }
        );

        let body = Stmt::var("s", TypeRef::string(), Some(Expr::int(2)));
        let err = generate(&registry, frame(TypeRef::void()), &body).unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::while_loop(Expr::int(1), Stmt::block(vec![]));
        let err = generate(&registry, frame(TypeRef::void()), &body).unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));
    }
}
