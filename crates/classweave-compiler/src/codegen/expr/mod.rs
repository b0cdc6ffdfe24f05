//! Expression preparation.
//!
//! [`CodeGenerator::prepare_expr`] dispatches on the node kind. Names,
//! calls, operators and meta-expressions live in submodules; the simple
//! kinds are handled here.

mod binary;
mod calls;
mod meta;
mod names;

use ordered_float::OrderedFloat;

use classweave_core::ast::{CodeNode, Expr, ExprKind, Literal, UnaryOp};
use classweave_core::{CompilationError, PrimitiveKind, Region, TypeRef};

use super::overload::{render_args, select_overload};
use super::prepared::{ExprOp, PreparedExpr, PreparedStmt};
use super::{CodeGenerator, Result};
use crate::emitter::{Constant, ValueKind};
use crate::quote::quote;

fn literal_constant(literal: &Literal) -> Constant {
    match literal {
        Literal::String(value) => Constant::String(value.clone()),
        Literal::Int(value) => Constant::Int(*value),
        Literal::Long(value) => Constant::Long(*value),
        Literal::Float(value) => Constant::Float(OrderedFloat(*value)),
        Literal::Double(value) => Constant::Double(OrderedFloat(*value)),
        Literal::Boolean(value) => Constant::Int(i32::from(*value)),
    }
}

impl CodeGenerator<'_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn prepare_expr(&mut self, expr: &Expr) -> Result<PreparedExpr> {
        let region = expr.region;
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(PreparedExpr::new(
                literal.type_ref(),
                ExprOp::Constant(literal_constant(literal)),
            )),
            ExprKind::Null => Ok(PreparedExpr::new(
                TypeRef::Null,
                ExprOp::Constant(Constant::Null),
            )),
            ExprKind::This => self.prepare_this(region),
            ExprKind::Binary { op, lhs, rhs } => self.prepare_binary(*op, lhs, rhs, region),
            ExprKind::Unary { op, operand } => self.prepare_unary(*op, operand, region),
            ExprKind::IncDec {
                timing,
                op,
                operand,
            } => {
                let local = operand
                    .as_local_name()
                    .and_then(|name| self.lookup_local(name))
                    .filter(|local| local.ty.as_primitive() == Some(PrimitiveKind::Int));
                let Some(local) = local else {
                    return Err(CompilationError::unsupported(
                        "'++'/'--' on anything but an int local",
                        region,
                    ));
                };
                Ok(PreparedExpr::new(
                    local.ty,
                    ExprOp::IncDec {
                        slot: local.slot,
                        delta: op.delta(),
                        timing: *timing,
                    },
                ))
            }
            ExprKind::Invocation {
                target,
                method,
                args,
            } => self.prepare_invocation(target.as_ref(), method, args, region),
            ExprKind::FieldGet { target, name } => self.prepare_field_get(target, name, region),
            ExprKind::FieldSet {
                target,
                name,
                value,
            } => self.prepare_field_set(target, name, value, region),
            ExprKind::Lookup(name) => self.prepare_lookup(name, region),
            ExprKind::Assign { name, value } => self.prepare_assign(name, value, region),
            ExprKind::AmbiguousName(parts) => self.prepare_ambiguous(parts, region),
            ExprKind::New { ty, args } => self.prepare_new(ty, args, region),
            ExprKind::Array {
                element_type,
                elements,
            } => {
                let element = self.bind(element_type)?;
                let elements = elements
                    .iter()
                    .map(|e| {
                        let value = self.prepare_expr(e)?;
                        self.coerce(value, &element, e.region)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(PreparedExpr::new(
                    TypeRef::array_of(element.clone()),
                    ExprOp::Array {
                        element: self.descriptor(&element)?,
                        store: ValueKind::of(&element),
                        elements,
                    },
                ))
            }
            ExprKind::Typecast { ty, expr } => {
                let operand = self.prepare_expr(expr)?;
                self.prepare_cast(ty, operand, region)
            }
            ExprKind::ClassLiteral(ty) => {
                let ty = self.bind(ty)?;
                let name = ty.internal_name(Some(&self.this_class))?;
                Ok(PreparedExpr::new(
                    TypeRef::generic("java/lang/Class", vec![ty]),
                    ExprOp::Constant(Constant::Class(name)),
                ))
            }
            ExprKind::Meta(body) => {
                let value = self.run_stage(body, region)?;
                let spliced = value.into_expr(region)?;
                self.prepare_expr(&spliced)
            }
            ExprKind::Quote(node) => {
                let reconstruction = quote(node, Some(&self.this_class))?;
                self.prepare_expr(&reconstruction)
            }
            ExprKind::Inject(inner) => self.prepare_expr(inner),
        }
    }

    /// Prepare an expression statement's node, which a meta stage may turn
    /// into any code.
    pub(super) fn prepare_node(&mut self, node: &CodeNode) -> Result<PreparedStmt> {
        match node {
            CodeNode::Stmt(stmt) => self.prepare_stmt(stmt),
            CodeNode::Expr(expr) => Ok(PreparedStmt::Expr(self.prepare_expr(expr)?)),
        }
    }

    fn prepare_this(&self, region: Region) -> Result<PreparedExpr> {
        if self.is_static {
            return Err(CompilationError::unsupported("'this' in a static method", region));
        }
        Ok(PreparedExpr::new(
            TypeRef::class(self.this_class.clone()),
            ExprOp::LoadThis,
        ))
    }

    fn prepare_unary(&mut self, op: UnaryOp, operand: &Expr, region: Region) -> Result<PreparedExpr> {
        let operand = self.prepare_expr(operand)?;
        let kind = operand.ty.as_primitive();
        match op {
            UnaryOp::Neg if kind.is_some_and(PrimitiveKind::is_numeric) => Ok(PreparedExpr::new(
                operand.ty.clone(),
                ExprOp::Neg(Box::new(operand)),
            )),
            UnaryOp::Not if kind == Some(PrimitiveKind::Boolean) => Ok(PreparedExpr::new(
                TypeRef::boolean(),
                ExprOp::Not(Box::new(operand)),
            )),
            UnaryOp::Neg => Err(CompilationError::unsupported(
                format!("unary '-' on {}", operand.ty),
                region,
            )),
            UnaryOp::Not => Err(CompilationError::unsupported(
                format!("'!' on {}", operand.ty),
                region,
            )),
        }
    }

    fn prepare_new(&mut self, ty: &TypeRef, args: &[Expr], region: Region) -> Result<PreparedExpr> {
        let ty = self.bind(ty)?;
        let TypeRef::Class(class) = &ty else {
            return Err(CompilationError::unsupported(format!("'new' of {ty}"), region));
        };
        let args = args
            .iter()
            .map(|a| self.prepare_expr(a))
            .collect::<Result<Vec<_>>>()?;
        let arg_types: Vec<TypeRef> = args.iter().map(|a| a.ty.clone()).collect();

        let env = self.env();
        let constructor = self
            .universe
            .lookup(&class.name)
            .and_then(|info| {
                select_overload(&info.constructors, |c| &c.params, &arg_types, &env)
            })
            .ok_or_else(|| CompilationError::UnresolvedConstructor {
                owner: class.name.clone(),
                args: render_args(&arg_types),
                region,
            })?;
        let descriptor = constructor.descriptor().descriptor(Some(&self.this_class))?;
        let args = args
            .into_iter()
            .zip(&constructor.params)
            .map(|(arg, param)| self.coerce(arg, param, region))
            .collect::<Result<Vec<_>>>()?;

        Ok(PreparedExpr::new(
            ty.clone(),
            ExprOp::New {
                class: class.name.clone(),
                constructor: descriptor,
                args,
            },
        ))
    }

    fn prepare_cast(
        &mut self,
        ty: &TypeRef,
        operand: PreparedExpr,
        region: Region,
    ) -> Result<PreparedExpr> {
        let target = self.bind(ty)?;
        if target.is_reference() && operand.ty.is_reference() {
            let class = target.internal_name(Some(&self.this_class))?;
            return Ok(PreparedExpr::new(
                target,
                ExprOp::CheckCast {
                    class,
                    operand: Box::new(operand),
                },
            ));
        }
        if target == operand.ty {
            return Ok(operand);
        }
        Err(CompilationError::unsupported(
            format!("cast from {} to {target}", operand.ty),
            region,
        ))
    }
}
