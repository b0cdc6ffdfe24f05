//! Names: locals, fields and dotted names.

use classweave_core::ast::{CallTarget, Expr};
use classweave_core::{CompilationError, FieldInfo, Region, TypeRef};

use super::super::prepared::{ExprOp, PreparedExpr};
use super::super::{CodeGenerator, Result};
use crate::emitter::{LocalKind, MemberRef};

/// A field resolved against the universe.
struct ResolvedField {
    owner: String,
    info: FieldInfo,
}

impl CodeGenerator<'_> {
    fn find_field(&self, owner: &str, name: &str, region: Region) -> Result<ResolvedField> {
        self.universe
            .find_field(owner, name)
            .map(|(owner, info)| ResolvedField { owner, info })
            .ok_or_else(|| CompilationError::UnknownField {
                owner: owner.to_string(),
                name: name.to_string(),
                region,
            })
    }

    fn field_ref(&self, field: &ResolvedField) -> Result<MemberRef> {
        Ok(MemberRef::new(
            field.owner.clone(),
            field.info.name.clone(),
            self.descriptor(&field.info.ty)?,
        ))
    }

    /// Class whose members a receiver of type `ty` exposes.
    pub(super) fn receiver_class(&self, ty: &TypeRef, region: Region) -> Result<String> {
        match self.bind(ty)? {
            TypeRef::Class(class) => Ok(class.name),
            TypeRef::Array(_) => Ok(classweave_core::OBJECT.to_string()),
            other => Err(CompilationError::unsupported(
                format!("member access on {other}"),
                region,
            )),
        }
    }

    /// A bare name: a local, else a field of the class being compiled.
    pub(super) fn prepare_lookup(&mut self, name: &str, region: Region) -> Result<PreparedExpr> {
        if let Some(local) = self.lookup_local(name) {
            return Ok(PreparedExpr::new(
                local.ty.clone(),
                ExprOp::Load {
                    kind: local.kind(),
                    slot: local.slot,
                },
            ));
        }

        let field = self.find_field(&self.this_class, name, region)?;
        let field_ref = self.field_ref(&field)?;
        if field.info.access.is_static() {
            return Ok(PreparedExpr::new(field.info.ty, ExprOp::GetStatic(field_ref)));
        }
        let this = self.prepare_this(region)?;
        Ok(PreparedExpr::new(
            field.info.ty,
            ExprOp::GetField {
                target: Box::new(this),
                field: field_ref,
            },
        ))
    }

    /// `name = value` on a local, else on a field of the class being compiled.
    pub(super) fn prepare_assign(
        &mut self,
        name: &str,
        value: &Expr,
        region: Region,
    ) -> Result<PreparedExpr> {
        let value = self.prepare_expr(value)?;
        if let Some(local) = self.lookup_local(name) {
            let value = self.coerce(value, &local.ty, region)?;
            return Ok(PreparedExpr::new(
                local.ty.clone(),
                ExprOp::Store {
                    kind: LocalKind::of(&local.ty),
                    slot: local.slot,
                    value: Box::new(value),
                },
            ));
        }

        let field = self.find_field(&self.this_class, name, region)?;
        let field_ref = self.field_ref(&field)?;
        let value = self.coerce(value, &field.info.ty, region)?;
        if field.info.access.is_static() {
            return Ok(PreparedExpr::new(
                field.info.ty,
                ExprOp::PutStatic {
                    field: field_ref,
                    value: Box::new(value),
                },
            ));
        }
        let this = self.prepare_this(region)?;
        Ok(PreparedExpr::new(
            field.info.ty,
            ExprOp::PutField {
                target: Box::new(this),
                field: field_ref,
                value: Box::new(value),
            },
        ))
    }

    pub(super) fn prepare_field_get(
        &mut self,
        target: &CallTarget,
        name: &str,
        region: Region,
    ) -> Result<PreparedExpr> {
        match target {
            CallTarget::Type(ty) => {
                let owner = self.receiver_class(ty, region)?;
                let field = self.find_field(&owner, name, region)?;
                if !field.info.access.is_static() {
                    return Err(CompilationError::unsupported(
                        format!("instance field '{name}' read through a type"),
                        region,
                    ));
                }
                let field_ref = self.field_ref(&field)?;
                Ok(PreparedExpr::new(field.info.ty, ExprOp::GetStatic(field_ref)))
            }
            CallTarget::Expr(target) => {
                let target = self.prepare_expr(target)?;
                if matches!(target.ty, TypeRef::Array(_)) && name == "length" {
                    return Ok(PreparedExpr::new(
                        TypeRef::int(),
                        ExprOp::ArrayLength(Box::new(target)),
                    ));
                }
                let owner = self.receiver_class(&target.ty, region)?;
                let field = self.find_field(&owner, name, region)?;
                let field_ref = self.field_ref(&field)?;
                if field.info.access.is_static() {
                    let ty = field.info.ty;
                    return Ok(PreparedExpr::new(
                        ty.clone(),
                        ExprOp::Sequence {
                            first: Box::new(target),
                            then: Box::new(PreparedExpr::new(ty, ExprOp::GetStatic(field_ref))),
                        },
                    ));
                }
                Ok(PreparedExpr::new(
                    field.info.ty,
                    ExprOp::GetField {
                        target: Box::new(target),
                        field: field_ref,
                    },
                ))
            }
        }
    }

    pub(super) fn prepare_field_set(
        &mut self,
        target: &CallTarget,
        name: &str,
        value: &Expr,
        region: Region,
    ) -> Result<PreparedExpr> {
        let (receiver, owner) = match target {
            CallTarget::Type(ty) => (None, self.receiver_class(ty, region)?),
            CallTarget::Expr(target) => {
                let target = self.prepare_expr(target)?;
                let owner = self.receiver_class(&target.ty, region)?;
                (Some(target), owner)
            }
        };
        let field = self.find_field(&owner, name, region)?;
        let field_ref = self.field_ref(&field)?;
        let value = self.prepare_expr(value)?;
        let value = Box::new(self.coerce(value, &field.info.ty, region)?);

        match receiver {
            Some(receiver) if !field.info.access.is_static() => Ok(PreparedExpr::new(
                field.info.ty,
                ExprOp::PutField {
                    target: Box::new(receiver),
                    field: field_ref,
                    value,
                },
            )),
            None if !field.info.access.is_static() => Err(CompilationError::unsupported(
                format!("instance field '{name}' written through a type"),
                region,
            )),
            Some(receiver) => {
                let ty = field.info.ty;
                Ok(PreparedExpr::new(
                    ty.clone(),
                    ExprOp::Sequence {
                        first: Box::new(receiver),
                        then: Box::new(PreparedExpr::new(
                            ty,
                            ExprOp::PutStatic {
                                field: field_ref,
                                value,
                            },
                        )),
                    },
                ))
            }
            None => Ok(PreparedExpr::new(
                field.info.ty,
                ExprOp::PutStatic {
                    field: field_ref,
                    value,
                },
            )),
        }
    }

    /// A dotted name: `local.f.g`, `field.f`, or `pkg.Class.STATIC.f`.
    pub(super) fn prepare_ambiguous(
        &mut self,
        parts: &[String],
        region: Region,
    ) -> Result<PreparedExpr> {
        let Some((head, rest)) = parts.split_first() else {
            return Err(CompilationError::internal("empty dotted name"));
        };

        let is_value = self.lookup_local(head).is_some()
            || self.universe.find_field(&self.this_class, head).is_some();
        let (mut expr, rest) = if is_value {
            (Expr::lookup(head.clone()).at(region), rest)
        } else {
            // longest prefix naming a class, followed by a static field
            let split = (1..parts.len())
                .rev()
                .find(|&len| self.universe.lookup(&parts[..len].join("/")).is_some());
            let Some(len) = split else {
                if self.universe.lookup(&parts.join("/")).is_some() {
                    return Err(CompilationError::unsupported(
                        format!("type '{}' used as a value", parts.join(".")),
                        region,
                    ));
                }
                return Err(CompilationError::UnknownField {
                    owner: self.this_class.clone(),
                    name: head.clone(),
                    region,
                });
            };
            let owner = TypeRef::class(parts[..len].join("/"));
            (
                Expr::static_field(owner, parts[len].clone()).at(region),
                &parts[len + 1..],
            )
        };

        for name in rest {
            expr = Expr::field(expr, name.clone()).at(region);
        }
        self.prepare_expr(&expr)
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::Frame;
    use super::super::super::tests::generate;
    use crate::emitter::{Constant, Insn, LocalKind, MemberRef, ValueKind};
    use classweave_core::ast::{CallTarget, Expr, ExprKind, Parameter, Stmt};
    use classweave_core::{AccessFlags, ClassInfo, CompilationError, FieldInfo, TypeRef};
    use classweave_registry::{ClassOverlay, ClassRegistry};

    fn target() -> ClassInfo {
        ClassInfo::class("demo/Target")
            .with_field(FieldInfo::new("count", TypeRef::int(), AccessFlags::PUBLIC))
            .with_field(FieldInfo::new(
                "TOTAL",
                TypeRef::long(),
                AccessFlags::PUBLIC | AccessFlags::STATIC,
            ))
    }

    #[test]
    fn static_field_through_dotted_class_name() {
        let registry = ClassRegistry::with_bootstrap();
        let parts = ["java", "lang", "Integer", "MAX_VALUE"]
            .map(String::from)
            .to_vec();
        let body = Stmt::ret(Some(Expr::synthetic(ExprKind::AmbiguousName(parts))));
        let frame = Frame::method("demo/Target", true, TypeRef::int(), Vec::new());
        let (insns, _) = generate(&registry, frame, &body).unwrap();
        assert_eq!(
            insns[0],
            Insn::GetStatic(MemberRef::new("java/lang/Integer", "MAX_VALUE", "I"))
        );
    }

    #[test]
    fn dotted_local_reads_array_length() {
        let registry = ClassRegistry::with_bootstrap();
        let parts = vec!["xs".to_string(), "length".to_string()];
        let body = Stmt::ret(Some(Expr::synthetic(ExprKind::AmbiguousName(parts))));
        let frame = Frame::method(
            "demo/Target",
            true,
            TypeRef::int(),
            vec![Parameter::new("xs", TypeRef::array_of(TypeRef::int()))],
        );
        let (insns, _) = generate(&registry, frame, &body).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Load {
                    kind: LocalKind::Reference,
                    slot: 0
                },
                Insn::ArrayLength,
                Insn::Return(ValueKind::Int),
            ]
        );
    }

    #[test]
    fn assignment_falls_back_to_fields() {
        let registry = ClassRegistry::with_bootstrap();
        let overlay = ClassOverlay::single(&registry, target());
        let frame = Frame::method("demo/Target", false, TypeRef::void(), Vec::new());
        let body = Stmt::block(vec![
            Stmt::expr(Expr::assign("count", Expr::int(2))),
            Stmt::expr(Expr::assign(
                "TOTAL",
                Expr::literal(classweave_core::ast::Literal::Long(9)),
            )),
        ]);
        let (insns, _) = generate(&overlay, frame, &body).unwrap();
        assert!(insns.iter().any(|i| matches!(i, Insn::PutField(f) if f.name == "count")));
        assert!(insns.iter().any(|i| matches!(i, Insn::PutStatic(f) if f.descriptor == "J")));
        // statement position: nothing duplicated
        assert!(!insns.iter().any(|i| matches!(i, Insn::DupX1 | Insn::Dup2)));
    }

    #[test]
    fn stores_are_checked_against_the_field_type() {
        let registry = ClassRegistry::with_bootstrap();
        let overlay = ClassOverlay::single(&registry, target());
        let frame = Frame::method("demo/Target", false, TypeRef::void(), Vec::new());

        let body = Stmt::expr(Expr::assign("TOTAL", Expr::int(9)));
        let (insns, _) = generate(&overlay, frame.clone(), &body).unwrap();
        assert_eq!(
            insns.as_slice(),
            &[
                Insn::Push(Constant::Int(9)),
                Insn::Convert {
                    from: ValueKind::Int,
                    to: ValueKind::Long
                },
                Insn::PutStatic(MemberRef::new("demo/Target", "TOTAL", "J")),
            ]
        );

        let body = Stmt::expr(Expr::field_set(
            CallTarget::Expr(Box::new(Expr::this())),
            "count",
            Expr::string("many"),
        ));
        let err = generate(&overlay, frame, &body).unwrap_err();
        assert!(matches!(err, CompilationError::Unsupported { .. }));
    }

    #[test]
    fn field_set_in_value_position_keeps_the_value() {
        let registry = ClassRegistry::with_bootstrap();
        let overlay = ClassOverlay::single(&registry, target());
        let frame = Frame::method("demo/Target", false, TypeRef::int(), Vec::new());
        let body = Stmt::ret(Some(Expr::field_set(
            CallTarget::Expr(Box::new(Expr::this())),
            "count",
            Expr::int(4),
        )));
        let (insns, _) = generate(&overlay, frame, &body).unwrap();
        assert!(insns.iter().any(|i| *i == Insn::DupX1));
    }

    #[test]
    fn instance_field_through_type_is_rejected() {
        let registry = ClassRegistry::with_bootstrap();
        let overlay = ClassOverlay::single(&registry, target());
        let frame = Frame::method("demo/Target", true, TypeRef::int(), Vec::new());
        let body = Stmt::ret(Some(Expr::static_field(TypeRef::class("demo/Target"), "count")));
        assert!(generate(&overlay, frame, &body).is_err());
    }
}
