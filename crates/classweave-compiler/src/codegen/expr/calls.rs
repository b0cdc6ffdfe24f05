//! Method invocation.

use tracing::debug;

use classweave_core::ast::{CallTarget, Expr};
use classweave_core::{CompilationError, MethodRef, OBJECT, Region, TypeRef};

use super::super::overload::{render_args, select_overload};
use super::super::prepared::{ExprOp, PreparedExpr};
use super::super::{CodeGenerator, Result};
use crate::emitter::{InvokeKind, MemberRef};

fn method_params(candidate: &MethodRef) -> &[TypeRef] {
    &candidate.method.params
}

impl CodeGenerator<'_> {
    /// Best match for `name(args)` on `owner`, optionally statics only.
    fn resolve_method(
        &self,
        owner: &str,
        name: &str,
        arg_types: &[TypeRef],
        statics_only: bool,
    ) -> Option<MethodRef> {
        let candidates: Vec<MethodRef> = self
            .universe
            .methods_named(owner, name)
            .into_iter()
            .filter(|c| !statics_only || c.method.is_static())
            .collect();
        select_overload(&candidates, method_params, arg_types, &self.env()).cloned()
    }

    pub(super) fn prepare_invocation(
        &mut self,
        target: Option<&CallTarget>,
        name: &str,
        args: &[Expr],
        region: Region,
    ) -> Result<PreparedExpr> {
        let receiver = match target {
            Some(CallTarget::Expr(expr)) => Some(self.prepare_expr(expr)?),
            _ => None,
        };
        let args = args
            .iter()
            .map(|a| self.prepare_expr(a))
            .collect::<Result<Vec<_>>>()?;
        let arg_types: Vec<TypeRef> = args.iter().map(|a| a.ty.clone()).collect();

        let (owner, receiver_type, statics_only) = match (target, &receiver) {
            (Some(CallTarget::Type(ty)), _) => (self.receiver_class(ty, region)?, None, true),
            (_, Some(receiver)) => (
                self.receiver_class(&receiver.ty, region)?,
                Some(self.bind(&receiver.ty)?),
                false,
            ),
            _ => (self.this_class.clone(), None, false),
        };

        let mut resolved = self.resolve_method(&owner, name, &arg_types, statics_only);
        if resolved.is_none() && !statics_only && owner != OBJECT {
            resolved = self.resolve_method(OBJECT, name, &arg_types, false);
            if resolved.is_some() {
                debug!(owner = %owner, method = name, "resolved through {OBJECT}");
            }
        }
        let Some(resolved) = resolved else {
            return Err(CompilationError::UnresolvedMethod {
                owner,
                name: name.to_string(),
                args: render_args(&arg_types),
                region,
            });
        };
        let method = &resolved.method;
        let args = args
            .into_iter()
            .zip(&method.params)
            .map(|(arg, param)| self.coerce(arg, param, region))
            .collect::<Result<Vec<_>>>()?;

        // an unqualified call to an instance method targets `this`
        let receiver = match receiver {
            None if target.is_none() && !method.is_static() => Some(self.prepare_this(region)?),
            other => other,
        };
        let kind = if method.is_static() {
            InvokeKind::Static
        } else if resolved.owner_is_interface {
            InvokeKind::Interface
        } else {
            InvokeKind::Virtual
        };
        // a static method called through an instance still evaluates it
        let (receiver, discarded) = match receiver {
            Some(receiver) if method.is_static() => (None, Some(receiver)),
            other => (other, None),
        };

        let (ty, cast) = match &method.generic_return {
            Some(var) => self.instantiate_return(var, &owner, &resolved.owner, receiver_type.as_ref())?,
            None => (method.return_type.clone(), None),
        };
        let descriptor = method.descriptor().descriptor(Some(&self.this_class))?;
        let invoke = PreparedExpr::new(
            ty.clone(),
            ExprOp::Invoke {
                kind,
                receiver: receiver.map(Box::new),
                method: MemberRef::new(resolved.owner.clone(), name, descriptor),
                args,
                cast,
            },
        );

        Ok(match discarded {
            Some(first) => PreparedExpr::new(
                ty,
                ExprOp::Sequence {
                    first: Box::new(first),
                    then: Box::new(invoke),
                },
            ),
            None => invoke,
        })
    }

    /// Concrete type of a return typed by type variable `var`, plus the
    /// class to check the erased result against.
    ///
    /// The variable is looked up in the receiver's class first, then in the
    /// declaring class; without matching type arguments the erased type
    /// stands.
    fn instantiate_return(
        &self,
        var: &str,
        receiver_class: &str,
        declaring_class: &str,
        receiver_type: Option<&TypeRef>,
    ) -> Result<(TypeRef, Option<String>)> {
        let erased = (TypeRef::object(), None);
        let Some(receiver_type) = receiver_type else {
            return Ok(erased);
        };
        let index = [receiver_class, declaring_class].into_iter().find_map(|class| {
            self.universe
                .lookup(class)
                .and_then(|info| info.type_params.iter().position(|p| p == var))
        });
        let Some(actual) = index.and_then(|i| receiver_type.type_args().get(i)) else {
            return Ok(erased);
        };
        let actual = self.bind(actual)?;
        if !actual.is_reference() {
            return Ok(erased);
        }
        let class = actual.internal_name(Some(&self.this_class))?;
        Ok((actual, Some(class)))
    }
}
