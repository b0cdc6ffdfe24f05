//! Binary operators.
//!
//! Supported combinations:
//! - `+` with a `String` on either side: both sides are converted to
//!   strings and concatenated with `String.concat`
//! - `+ - * / %` on two operands of the same `int`, `long`, `float` or
//!   `double` kind
//! - comparisons on two `int`s, and `==`/`!=` on two `boolean`s
//!
//! Anything else is [`CompilationError::Unsupported`].

use classweave_core::ast::{BinaryOp, Expr};
use classweave_core::{CompilationError, OBJECT, PrimitiveKind, Region, STRING, TypeRef};

use super::super::prepared::{ExprOp, PreparedExpr};
use super::super::{CodeGenerator, Result};
use crate::emitter::{ArithOp, Comparison, InvokeKind, MemberRef, ValueKind};

fn arith_op(op: BinaryOp) -> Option<ArithOp> {
    Some(match op {
        BinaryOp::Add => ArithOp::Add,
        BinaryOp::Sub => ArithOp::Sub,
        BinaryOp::Mul => ArithOp::Mul,
        BinaryOp::Div => ArithOp::Div,
        BinaryOp::Rem => ArithOp::Rem,
        _ => return None,
    })
}

fn comparison(op: BinaryOp) -> Option<Comparison> {
    Some(match op {
        BinaryOp::Lt => Comparison::Lt,
        BinaryOp::LtEq => Comparison::Le,
        BinaryOp::Gt => Comparison::Gt,
        BinaryOp::GtEq => Comparison::Ge,
        BinaryOp::Eq => Comparison::Eq,
        BinaryOp::NotEq => Comparison::Ne,
        _ => return None,
    })
}

fn string_conversion(operand: PreparedExpr, region: Region) -> Result<PreparedExpr> {
    let string = TypeRef::string();
    if operand.ty.is_string() {
        return Ok(operand);
    }

    let ty = operand.ty.clone();
    let (kind, receiver, method, args) = match &ty {
        TypeRef::Primitive(primitive) => {
            let (owner, descriptor) = match primitive {
                PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Byte => {
                    ("java/lang/Integer", "(I)Ljava/lang/String;")
                }
                PrimitiveKind::Long => ("java/lang/Long", "(J)Ljava/lang/String;"),
                PrimitiveKind::Boolean => ("java/lang/Boolean", "(Z)Ljava/lang/String;"),
                other => {
                    return Err(CompilationError::unsupported(
                        format!("string conversion of {other}"),
                        region,
                    ));
                }
            };
            (
                InvokeKind::Static,
                None,
                MemberRef::new(owner, "toString", descriptor),
                vec![operand],
            )
        }
        TypeRef::Null => (
            InvokeKind::Static,
            None,
            MemberRef::new(STRING, "valueOf", "(Ljava/lang/Object;)Ljava/lang/String;"),
            vec![operand],
        ),
        _ => (
            InvokeKind::Virtual,
            Some(Box::new(operand)),
            MemberRef::new(OBJECT, "toString", "()Ljava/lang/String;"),
            Vec::new(),
        ),
    };
    Ok(PreparedExpr::new(
        string,
        ExprOp::Invoke {
            kind,
            receiver,
            method,
            args,
            cast: None,
        },
    ))
}

impl CodeGenerator<'_> {
    pub(super) fn prepare_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        region: Region,
    ) -> Result<PreparedExpr> {
        let lhs = self.prepare_expr(lhs)?;
        let rhs = self.prepare_expr(rhs)?;

        if op == BinaryOp::Add && (lhs.ty.is_string() || rhs.ty.is_string()) {
            let lhs = string_conversion(lhs, region)?;
            let rhs = string_conversion(rhs, region)?;
            return Ok(PreparedExpr::new(
                TypeRef::string(),
                ExprOp::Invoke {
                    kind: InvokeKind::Virtual,
                    receiver: Some(Box::new(lhs)),
                    method: MemberRef::new(
                        STRING,
                        "concat",
                        "(Ljava/lang/String;)Ljava/lang/String;",
                    ),
                    args: vec![rhs],
                    cast: None,
                },
            ));
        }

        let kinds = (lhs.ty.as_primitive(), rhs.ty.as_primitive());
        if let (Some(arith), (Some(a), Some(b))) = (arith_op(op), kinds) {
            let numeric = matches!(
                a,
                PrimitiveKind::Int
                    | PrimitiveKind::Long
                    | PrimitiveKind::Float
                    | PrimitiveKind::Double
            );
            if a == b && numeric {
                return Ok(PreparedExpr::new(
                    lhs.ty.clone(),
                    ExprOp::Arith {
                        op: arith,
                        kind: ValueKind::of(&lhs.ty),
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                ));
            }
        }

        if let (Some(cmp), (Some(a), Some(b))) = (comparison(op), kinds) {
            let ints = a == PrimitiveKind::Int && b == PrimitiveKind::Int;
            let booleans = a == PrimitiveKind::Boolean
                && b == PrimitiveKind::Boolean
                && matches!(cmp, Comparison::Eq | Comparison::Ne);
            if ints || booleans {
                return Ok(PreparedExpr::new(
                    TypeRef::boolean(),
                    ExprOp::Compare {
                        op: cmp,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                ));
            }
        }

        Err(CompilationError::unsupported(
            format!("operator '{}' on {} and {}", op.symbol(), lhs.ty, rhs.ty),
            region,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::Frame;
    use super::super::super::tests::generate;
    use crate::emitter::{ArithOp, Constant, Insn, InvokeKind, MemberRef, ValueKind};
    use classweave_core::ast::{BinaryOp, Expr, Literal, Stmt};
    use classweave_core::{CompilationError, TypeRef};
    use classweave_registry::ClassRegistry;

    fn frame(return_type: TypeRef) -> Frame {
        Frame::method("demo/Target", true, return_type, Vec::new())
    }

    #[test]
    fn int_addition() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::ret(Some(Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2))));
        let (insns, _) = generate(&registry, frame(TypeRef::int()), &body).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Push(Constant::Int(1)),
                Insn::Push(Constant::Int(2)),
                Insn::Arith {
                    op: ArithOp::Add,
                    kind: ValueKind::Int
                },
                Insn::Return(ValueKind::Int),
            ]
        );
    }

    #[test]
    fn string_concatenation_converts_ints() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::ret(Some(Expr::binary(
            BinaryOp::Add,
            Expr::string("a"),
            Expr::int(1),
        )));
        let (insns, _) = generate(&registry, frame(TypeRef::string()), &body).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Push(Constant::String("a".into())),
                Insn::Push(Constant::Int(1)),
                Insn::Invoke {
                    kind: InvokeKind::Static,
                    method: MemberRef::new("java/lang/Integer", "toString", "(I)Ljava/lang/String;"),
                },
                Insn::Invoke {
                    kind: InvokeKind::Virtual,
                    method: MemberRef::new(
                        "java/lang/String",
                        "concat",
                        "(Ljava/lang/String;)Ljava/lang/String;"
                    ),
                },
                Insn::Return(ValueKind::Reference),
            ]
        );
    }

    #[test]
    fn long_arithmetic() {
        let registry = ClassRegistry::with_bootstrap();
        let long = |v| Expr::literal(Literal::Long(v));
        let body = Stmt::ret(Some(Expr::binary(BinaryOp::Mul, long(3), long(4))));
        let (insns, _) = generate(&registry, frame(TypeRef::long()), &body).unwrap();
        assert_eq!(
            insns[2],
            Insn::Arith {
                op: ArithOp::Mul,
                kind: ValueKind::Long
            }
        );
    }

    #[test]
    fn mixed_kinds_are_unsupported() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::ret(Some(Expr::binary(
            BinaryOp::Add,
            Expr::int(1),
            Expr::boolean(true),
        )));
        let err = generate(&registry, frame(TypeRef::int()), &body).unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));
        assert!(err.to_string().contains("operator '+' on int and boolean"));

        let body = Stmt::ret(Some(Expr::binary(
            BinaryOp::Sub,
            Expr::string("a"),
            Expr::string("b"),
        )));
        assert!(generate(&registry, frame(TypeRef::string()), &body).is_err());
    }

    #[test]
    fn comparison_yields_boolean() {
        let registry = ClassRegistry::with_bootstrap();
        let body = Stmt::ret(Some(Expr::binary(BinaryOp::LtEq, Expr::int(1), Expr::int(2))));
        let (insns, _) = generate(&registry, frame(TypeRef::boolean()), &body).unwrap();
        assert!(insns.iter().any(|i| matches!(
            i,
            Insn::Jump {
                condition: crate::emitter::JumpCondition::IntCompare(
                    crate::emitter::Comparison::Gt
                ),
                ..
            }
        )));
    }
}
